//! Catalog API client.
//!
//! All endpoints live under `{base_url}/api/rest` and are signed with an
//! OAuth 1.0a `PLAINTEXT` header (see [`signing`]). Responses are normalized
//! by [`wire`] before they leave this module.

mod error;
pub mod signing;
mod wire;

use std::time::Duration;

use reqwest::header::{
    ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT as USER_AGENT_HEADER,
};
use serde_json::Value;
use tracing::debug;

pub use self::error::CatalogError;
use self::error::classify_reqwest_error;
pub use self::signing::OAuthCredentials;
use crate::catalog::listing::ProductSource;
use crate::catalog::model::{Category, Product, ProductPage};
use crate::catalog::navigator::{CategoryScope, CategorySource};

/// Standard User-Agent header for storefront API requests.
pub const USER_AGENT: &str = concat!("storefront/", env!("CARGO_PKG_VERSION"));

/// Path prefix of every REST endpoint.
const REST_PREFIX: &str = "/api/rest";

/// Extra relations the product detail endpoint can embed.
pub const DETAIL_FIELDS: &[&str] = &["image_gallery", "related_product"];

/// Paging and scoping for `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub category_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    pub fn for_category(category_id: impl Into<String>) -> Self {
        Self {
            category_id: Some(category_id.into()),
            ..Default::default()
        }
    }

    fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(id) = self.category_id.as_deref().filter(|id| !id.trim().is_empty()) {
            pairs.push(("category_id", id.trim().to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Authenticated client for the remote catalog.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: OAuthCredentials,
}

impl ApiClient {
    /// Creates a client. `timeout` of `None` disables the request timeout.
    pub fn new(
        base_url: &str,
        credentials: OAuthCredentials,
        timeout: Option<Duration>,
    ) -> Result<Self, CatalogError> {
        let base_url = base_url.trim().trim_end_matches('/');
        url::Url::parse(base_url)
            .map_err(|e| CatalogError::validation(format!("invalid base URL {base_url}: {e}")))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| CatalogError::validation(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.to_string(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &OAuthCredentials {
        &self.credentials
    }

    /// Replaces the signing credentials (after login or logout).
    pub fn set_credentials(&mut self, credentials: OAuthCredentials) {
        self.credentials = credentials;
    }

    /// `GET /categories`: the top-level category list.
    pub async fn categories(&self) -> Result<Vec<Category>, CatalogError> {
        let payload = self.get_json("/categories", &[]).await?;
        wire::decode_categories(payload)
    }

    /// `GET /categories/{id}`: the children of one category.
    pub async fn category_children(&self, id: &str) -> Result<Vec<Category>, CatalogError> {
        let id = path_segment(id, "category")?;
        let payload = self.get_json(&format!("/categories/{id}"), &[]).await?;
        wire::decode_categories(payload)
    }

    /// `GET /products`, optionally scoped to a category and paged.
    pub async fn products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        let payload = self.get_json("/products", &query.to_pairs()).await?;
        wire::decode_product_page(payload)
    }

    /// `GET /products/{id}`, embedding the requested relations.
    pub async fn product(&self, id: &str, load: &[&str]) -> Result<Product, CatalogError> {
        let id = path_segment(id, "product")?;
        let mut query = Vec::new();
        if !load.is_empty() {
            query.push(("load", load.join(",")));
        }
        let payload = self.get_json(&format!("/products/{id}"), &query).await?;
        wire::decode_product(payload)
    }

    /// Reports whether the configured credentials are accepted.
    ///
    /// Incomplete credentials report `false` without touching the network;
    /// 401/403 report `false`; any other failure is an error.
    pub async fn status_probe(&self) -> Result<bool, CatalogError> {
        if !self.credentials.is_complete() {
            debug!(missing = ?self.credentials.missing(), "credentials incomplete");
            return Ok(false);
        }

        match self.send("/categories", &[]).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_unauthorized() => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{REST_PREFIX}{path}", self.base_url)
    }

    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, CatalogError> {
        if !self.credentials.is_complete() {
            return Err(CatalogError::validation(format!(
                "missing OAuth credentials: {}",
                self.credentials.missing().join(", ")
            )));
        }

        let response = self.send(path, query).await?;
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;
        serde_json::from_str(&body).map_err(|e| CatalogError::decode(e.to_string()))
    }

    async fn send(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, CatalogError> {
        let url = self.endpoint(path);
        debug!(%url, ?query, "GET");

        let response = self
            .http
            .get(&url)
            .query(query)
            .headers(build_headers(&self.credentials))
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%url, status = status.as_u16(), "request failed");
            return Err(CatalogError::api(status.as_u16(), body));
        }
        Ok(response)
    }
}

impl CategorySource for ApiClient {
    async fn fetch_categories(
        &self,
        scope: &CategoryScope,
    ) -> Result<Vec<Category>, CatalogError> {
        match scope {
            CategoryScope::Root => self.categories().await,
            CategoryScope::Children(id) => self.category_children(id).await,
        }
    }
}

impl ProductSource for ApiClient {
    async fn fetch_products(&self, query: &ProductQuery) -> Result<ProductPage, CatalogError> {
        self.products(query).await
    }
}

fn require_id<'a>(id: &'a str, what: &str) -> Result<&'a str, CatalogError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CatalogError::validation(format!("{what} id is required")));
    }
    Ok(id)
}

/// A required id, percent-encoded for use as one path segment.
fn path_segment(id: &str, what: &str) -> Result<String, CatalogError> {
    require_id(id, what).map(|id| urlencoding::encode(id).into_owned())
}

fn build_headers(credentials: &OAuthCredentials) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&signing::authorization_header(credentials))
            .unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT_HEADER, HeaderValue::from_static(USER_AGENT));
    headers
}
