//! CLI command handlers.

pub mod auth;
pub mod categories;
pub mod config;
pub mod open;
pub mod product;
pub mod products;
