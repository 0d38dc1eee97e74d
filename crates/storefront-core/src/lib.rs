//! Core storefront library (API client, auth, catalog, config).

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod request;
pub mod routes;
