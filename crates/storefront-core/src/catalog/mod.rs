//! Catalog domain: model, client-side filtering, category navigation and
//! the product listing slot.

pub mod filter;
pub mod listing;
pub mod model;
pub mod navigator;
pub mod params;

pub use filter::{Facet, FilterState, SortKey, apply};
pub use listing::{ListingRequest, ProductListing, ProductSource};
pub use model::{Category, CategoryCrumb, PageInfo, Product, ProductPage, ProductStatus};
pub use navigator::{
    CategoryBrowser, CategoryNavigator, CategoryScope, CategorySource, EnterOutcome, FetchRequest,
};
