//! Product listing state: one fetched page plus client-side filters.
//!
//! Filters never trigger a refetch; they are re-applied to the loaded page.
//! Like the category navigator, a failed fetch keeps the previous page and
//! records the error.

use std::future::Future;

use tracing::{debug, warn};

use super::filter::{self, Facet, FilterState};
use super::model::{Product, ProductPage};
use crate::api::{CatalogError, ProductQuery};
use crate::request::{RequestToken, RequestTracker};
use crate::routes::Route;

/// A product page fetch the caller must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRequest {
    pub token: RequestToken,
    pub query: ProductQuery,
}

/// Anything that can fetch a product page.
pub trait ProductSource {
    fn fetch_products(
        &self,
        query: &ProductQuery,
    ) -> impl Future<Output = Result<ProductPage, CatalogError>> + Send;
}

#[derive(Debug, Default)]
pub struct ProductListing {
    category_id: Option<String>,
    filters: FilterState,
    page: ProductPage,
    visible: Vec<Product>,
    loading: bool,
    error: Option<String>,
    requests: RequestTracker,
}

impl ProductListing {
    pub fn new(category_id: Option<String>, filters: FilterState) -> Self {
        Self {
            category_id,
            filters,
            ..Default::default()
        }
    }

    /// Builds a listing from a `/products` route. Other routes yield `None`.
    pub fn from_route(route: &Route) -> Option<Self> {
        match route {
            Route::Products {
                category_id,
                filters,
            } => Some(Self::new(category_id.clone(), filters.clone())),
            _ => None,
        }
    }

    pub fn category_id(&self) -> Option<&str> {
        self.category_id.as_deref()
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// Products on the loaded page, before filtering.
    pub fn products(&self) -> &[Product] {
        &self.page.items
    }

    /// Products after filtering and sorting.
    pub fn visible(&self) -> &[Product] {
        &self.visible
    }

    pub fn total_count(&self) -> Option<u64> {
        self.page.total_count
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn manufacturer_facets(&self) -> Vec<Facet> {
        filter::manufacturer_facets(&self.page.items)
    }

    pub fn product_type_facets(&self) -> Vec<Facet> {
        filter::product_type_facets()
    }

    /// Route reflecting the current category and filters.
    pub fn route(&self) -> Route {
        Route::Products {
            category_id: self.category_id.clone(),
            filters: self.filters.clone(),
        }
    }

    /// Replaces the filters and re-applies them to the loaded page.
    pub fn set_filters(&mut self, filters: FilterState) {
        self.filters = filters;
        self.refresh_visible();
    }

    /// Starts fetching `page` (1-based) with `limit` items per page.
    pub fn begin_fetch(&mut self, page: Option<u32>, limit: Option<u32>) -> ListingRequest {
        self.loading = true;
        self.error = None;
        let token = self.requests.issue();
        let query = ProductQuery {
            category_id: self.category_id.clone(),
            page,
            limit,
        };
        debug!(token = token.value(), ?query, "issuing product fetch");
        ListingRequest { token, query }
    }

    /// Applies a fetch result. Returns false for superseded fetches.
    pub fn complete(
        &mut self,
        token: RequestToken,
        result: Result<ProductPage, CatalogError>,
    ) -> bool {
        if !self.requests.is_latest(token) {
            debug!(token = token.value(), "discarding stale product response");
            return false;
        }

        self.loading = false;
        match result {
            Ok(page) => {
                self.page = page;
                self.error = None;
                self.refresh_visible();
            }
            Err(err) => {
                warn!(error = %err, "product fetch failed");
                self.error = Some(err.to_string());
            }
        }
        true
    }

    /// Fetches and applies one page from `source`.
    pub async fn load<S: ProductSource>(
        &mut self,
        source: &S,
        page: Option<u32>,
        limit: Option<u32>,
    ) {
        let request = self.begin_fetch(page, limit);
        let result = source.fetch_products(&request.query).await;
        self.complete(request.token, result);
    }

    fn refresh_visible(&mut self) {
        self.visible = filter::apply(&self.page.items, &self.filters);
    }
}
