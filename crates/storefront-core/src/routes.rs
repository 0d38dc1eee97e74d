//! Navigable locations of the storefront.
//!
//! ```text
//! /                               auth screen
//! /products[?category_id=&...]    product listing (filters in the query)
//! /products/{id}                  product detail
//! anything else                   not found
//! ```

use std::fmt;
use std::str::FromStr;

use crate::catalog::filter::FilterState;

const CATEGORY_ID_KEY: &str = "category_id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Auth,
    Products {
        category_id: Option<String>,
        filters: FilterState,
    },
    ProductDetail {
        id: String,
    },
    NotFound(String),
}

impl Route {
    /// Unfiltered listing of one category.
    pub fn category_products(category_id: &str) -> Self {
        Route::Products {
            category_id: Some(category_id.to_string()),
            filters: FilterState::default(),
        }
    }

    pub fn product(id: &str) -> Self {
        Route::ProductDetail { id: id.to_string() }
    }

    /// Parses a route from a path (with optional query) or a full URL.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let (mut path, query) = match url::Url::parse(input) {
            Ok(url) if url.has_host() => {
                (url.path().to_string(), url.query().unwrap_or("").to_string())
            }
            _ => match input.split_once('?') {
                Some((path, query)) => (path.to_string(), query.to_string()),
                None => (input.to_string(), String::new()),
            },
        };
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').skip(1).collect();

        match segments.as_slice() {
            [] => Route::Auth,
            ["products"] => {
                let category_id = url::form_urlencoded::parse(query.as_bytes())
                    .filter(|(key, _)| key == CATEGORY_ID_KEY)
                    .map(|(_, value)| value.trim().to_string())
                    .filter(|value| !value.is_empty())
                    .last();
                Route::Products {
                    category_id,
                    filters: FilterState::from_query_string(&query),
                }
            }
            ["products", id] if !id.is_empty() => Route::product(id),
            _ => Route::NotFound(path.clone()),
        }
    }
}

impl FromStr for Route {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Route::parse(s))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Auth => f.write_str("/"),
            Route::Products {
                category_id,
                filters,
            } => {
                let mut query = url::form_urlencoded::Serializer::new(String::new());
                if let Some(id) = category_id {
                    query.append_pair(CATEGORY_ID_KEY, id);
                }
                query.extend_pairs(filters.to_params());
                let query = query.finish();
                if query.is_empty() {
                    f.write_str("/products")
                } else {
                    write!(f, "/products?{query}")
                }
            }
            Route::ProductDetail { id } => write!(f, "/products/{id}"),
            Route::NotFound(path) => f.write_str(path),
        }
    }
}
