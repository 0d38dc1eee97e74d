//! Query-parameter sync for [`FilterState`].
//!
//! Encoding:
//! - multi-valued fields are comma-joined (`manufacturer=1,2`)
//! - booleans are the literal `"true"` when set and absent otherwise
//! - price bounds only appear when set
//! - `sortBy` is omitted for the default ordering
//!
//! Decoding never fails: each key falls back to its default independently
//! and malformed numbers decode as `None`.

use std::collections::{BTreeMap, BTreeSet};

use super::filter::{FilterState, SortKey};
use super::model::parse_price;

pub const SEARCH_KEY: &str = "search";
pub const MANUFACTURER_KEY: &str = "manufacturer";
pub const PRODUCT_TYPE_KEY: &str = "productType";
pub const FEATURED_KEY: &str = "featured";
pub const PREMIUM_KEY: &str = "premium";
pub const MIN_PRICE_KEY: &str = "minPrice";
pub const MAX_PRICE_KEY: &str = "maxPrice";
pub const SORT_KEY: &str = "sortBy";

/// Flat, string-keyed parameter map (ordered for stable output).
pub type QueryParams = BTreeMap<String, String>;

impl FilterState {
    /// Serializes the filters into a flat parameter map.
    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();

        if !self.search_text.is_empty() {
            params.insert(SEARCH_KEY.to_string(), self.search_text.clone());
        }
        if !self.manufacturer_ids.is_empty() {
            params.insert(MANUFACTURER_KEY.to_string(), join_ids(&self.manufacturer_ids));
        }
        if !self.product_type_ids.is_empty() {
            params.insert(PRODUCT_TYPE_KEY.to_string(), join_ids(&self.product_type_ids));
        }
        if self.featured_only {
            params.insert(FEATURED_KEY.to_string(), "true".to_string());
        }
        if self.premium_only {
            params.insert(PREMIUM_KEY.to_string(), "true".to_string());
        }
        if let Some(min) = self.price_min {
            params.insert(MIN_PRICE_KEY.to_string(), min.to_string());
        }
        if let Some(max) = self.price_max {
            params.insert(MAX_PRICE_KEY.to_string(), max.to_string());
        }
        if self.sort_key != SortKey::default() {
            params.insert(SORT_KEY.to_string(), self.sort_key.to_string());
        }

        params
    }

    /// Builds filters from query parameters, ignoring unknown keys.
    pub fn from_params<K, V>(params: &BTreeMap<K, V>) -> Self
    where
        K: AsRef<str> + Ord,
        V: AsRef<str>,
    {
        Self::from_pairs(params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
    }

    /// Builds filters from key/value pairs. Later duplicates win.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut filters = Self::default();
        for (key, value) in pairs {
            match key {
                SEARCH_KEY => filters.search_text = value.to_string(),
                MANUFACTURER_KEY => filters.manufacturer_ids = split_ids(value),
                PRODUCT_TYPE_KEY => filters.product_type_ids = split_ids(value),
                FEATURED_KEY => filters.featured_only = value == "true",
                PREMIUM_KEY => filters.premium_only = value == "true",
                MIN_PRICE_KEY => filters.price_min = parse_price(value),
                MAX_PRICE_KEY => filters.price_max = parse_price(value),
                SORT_KEY => filters.sort_key = value.parse().unwrap_or_default(),
                _ => {}
            }
        }
        filters
    }

    /// Renders the filters as a form-urlencoded query string (no leading `?`).
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_params())
            .finish()
    }

    /// Parses a form-urlencoded query string; a leading `?` is tolerated.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        Self::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

fn join_ids(ids: &BTreeSet<String>) -> String {
    ids.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

fn split_ids(value: &str) -> BTreeSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_default_serializes_to_empty_map() {
        assert!(FilterState::default().to_params().is_empty());
        assert_eq!(FilterState::default().to_query_string(), "");
    }

    #[test]
    fn test_encoding_of_each_field() {
        let filters = FilterState {
            search_text: "lcd screen".to_string(),
            manufacturer_ids: BTreeSet::from(["123".to_string(), "7".to_string()]),
            product_type_ids: BTreeSet::from(["14".to_string()]),
            featured_only: true,
            premium_only: false,
            price_min: parse_price("10.50"),
            price_max: None,
            sort_key: SortKey::PriceDesc,
        };

        assert_eq!(
            filters.to_params(),
            params(&[
                ("search", "lcd screen"),
                ("manufacturer", "123,7"),
                ("productType", "14"),
                ("featured", "true"),
                ("minPrice", "10.5"),
                ("sortBy", "price_desc"),
            ])
        );
    }

    #[test]
    fn test_missing_keys_default_independently() {
        let filters = FilterState::from_params(&params(&[("premium", "true")]));
        assert!(filters.premium_only);
        assert!(!filters.featured_only);
        assert_eq!(filters.sort_key, SortKey::Newest);
        assert!(filters.manufacturer_ids.is_empty());
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let filters = FilterState::from_params(&params(&[
            ("minPrice", "cheap"),
            ("maxPrice", ""),
            ("featured", "yes"),
            ("sortBy", "random"),
            ("manufacturer", ",,"),
        ]));
        assert_eq!(filters, FilterState::default());
    }

    #[test]
    fn test_query_string_round_trip_with_escaping() {
        let filters = FilterState {
            search_text: "a&b=c ü".to_string(),
            price_max: parse_price("99.99"),
            ..Default::default()
        };
        let query = filters.to_query_string();
        assert!(!query.contains(' '));
        assert_eq!(FilterState::from_query_string(&query), filters);
        assert_eq!(FilterState::from_query_string(&format!("?{query}")), filters);
    }

    #[test]
    fn test_each_field_round_trips_independently() {
        let variants = [
            FilterState {
                search_text: "battery".to_string(),
                ..Default::default()
            },
            FilterState {
                manufacturer_ids: BTreeSet::from(["1".to_string()]),
                ..Default::default()
            },
            FilterState {
                product_type_ids: BTreeSet::from(["4".to_string(), "20".to_string()]),
                ..Default::default()
            },
            FilterState {
                featured_only: true,
                ..Default::default()
            },
            FilterState {
                premium_only: true,
                ..Default::default()
            },
            FilterState {
                price_min: Some(Decimal::new(1999, 2)),
                ..Default::default()
            },
            FilterState {
                price_max: Some(Decimal::from(250)),
                ..Default::default()
            },
            FilterState {
                sort_key: SortKey::NameDesc,
                ..Default::default()
            },
        ];
        for filters in variants {
            assert_eq!(FilterState::from_params(&filters.to_params()), filters);
        }
    }

    proptest! {
        #[test]
        fn prop_params_round_trip(
            search in "[a-zA-Z0-9 ,&=]{0,10}",
            mfr in prop::collection::btree_set("[0-9]{1,4}", 0..4),
            types in prop::collection::btree_set("[0-9]{1,3}", 0..3),
            featured in any::<bool>(),
            premium in any::<bool>(),
            min in prop::option::of(0i64..100_000),
            max in prop::option::of(0i64..100_000),
            sort in prop::sample::select(SortKey::all().to_vec()),
        ) {
            let filters = FilterState {
                search_text: search,
                manufacturer_ids: mfr,
                product_type_ids: types,
                featured_only: featured,
                premium_only: premium,
                price_min: min.map(|cents| Decimal::new(cents, 2).normalize()),
                price_max: max.map(|cents| Decimal::new(cents, 2).normalize()),
                sort_key: sort,
            };
            prop_assert_eq!(FilterState::from_params(&filters.to_params()), filters.clone());
            prop_assert_eq!(FilterState::from_query_string(&filters.to_query_string()), filters);
        }
    }
}
