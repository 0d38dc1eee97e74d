//! Client-side product filtering and ordering.
//!
//! `apply` is a pure function over an already fetched product page. The
//! filter state it consumes is owned by the caller (the listing view) and
//! round-trips through query parameters, see [`super::params`].

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::model::{PRODUCT_TYPES, Product};

/// Ordering applied after filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
    /// Descending numeric id. Higher ids are assumed to be newer; this is a
    /// heuristic, the catalog exposes no creation timestamp.
    #[default]
    Newest,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::NameAsc => "name_asc",
            SortKey::NameDesc => "name_desc",
            SortKey::PriceAsc => "price_asc",
            SortKey::PriceDesc => "price_desc",
            SortKey::Newest => "newest",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SortKey::NameAsc => "Name (A-Z)",
            SortKey::NameDesc => "Name (Z-A)",
            SortKey::PriceAsc => "Price (Low to High)",
            SortKey::PriceDesc => "Price (High to Low)",
            SortKey::Newest => "Newest First",
        }
    }

    pub fn all() -> &'static [SortKey] {
        &[
            SortKey::NameAsc,
            SortKey::NameDesc,
            SortKey::PriceAsc,
            SortKey::PriceDesc,
            SortKey::Newest,
        ]
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        match self {
            SortKey::NameAsc => compare_names(&a.name, &b.name),
            SortKey::NameDesc => compare_names(&b.name, &a.name),
            SortKey::PriceAsc => a.sort_price().cmp(&b.sort_price()),
            SortKey::PriceDesc => b.sort_price().cmp(&a.sort_price()),
            SortKey::Newest => b.numeric_id().cmp(&a.numeric_id()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "name_asc" => Ok(Self::NameAsc),
            "name_desc" => Ok(Self::NameDesc),
            "price_asc" => Ok(Self::PriceAsc),
            "price_desc" => Ok(Self::PriceDesc),
            "newest" => Ok(Self::Newest),
            other => Err(format!("Unknown sort key: {other}")),
        }
    }
}

/// User-selected filters for a product listing.
///
/// Every field has an "empty" default under which it does not restrict the
/// listing; the default state therefore keeps every product.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    pub search_text: String,
    pub manufacturer_ids: BTreeSet<String>,
    pub product_type_ids: BTreeSet<String>,
    pub featured_only: bool,
    pub premium_only: bool,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub sort_key: SortKey,
}

impl FilterState {
    /// Returns true if any filter (not the sort order) restricts the listing.
    pub fn has_active_filters(&self) -> bool {
        !self.search_text.trim().is_empty()
            || !self.manufacturer_ids.is_empty()
            || !self.product_type_ids.is_empty()
            || self.featured_only
            || self.premium_only
            || self.price_min.is_some()
            || self.price_max.is_some()
    }

    /// Clears every filter and restores the default ordering.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Adds the manufacturer if absent, removes it otherwise.
    pub fn toggle_manufacturer(&mut self, id: &str) {
        toggle(&mut self.manufacturer_ids, id);
    }

    /// Adds the product type if absent, removes it otherwise.
    pub fn toggle_product_type(&mut self, id: &str) {
        toggle(&mut self.product_type_ids, id);
    }

    /// Returns true if `product` passes every active filter.
    pub fn matches(&self, product: &Product) -> bool {
        if !self.search_text.is_empty()
            && !product
                .name
                .to_lowercase()
                .contains(&self.search_text.to_lowercase())
        {
            return false;
        }

        if !self.manufacturer_ids.is_empty() {
            match &product.manufacturer_id {
                Some(id) if self.manufacturer_ids.contains(id) => {}
                _ => return false,
            }
        }

        if !self.product_type_ids.is_empty()
            && !self.product_type_ids.contains(&product.product_type_id)
        {
            return false;
        }

        if self.featured_only && !product.featured {
            return false;
        }
        if self.premium_only && !product.premium {
            return false;
        }

        let price = product.sort_price();
        if self.price_min.is_some_and(|min| price < min) {
            return false;
        }
        if self.price_max.is_some_and(|max| price > max) {
            return false;
        }

        true
    }
}

fn toggle(set: &mut BTreeSet<String>, id: &str) {
    if !set.remove(id) {
        set.insert(id.to_string());
    }
}

/// Filters then sorts `products`. The sort is stable, so products with
/// equal keys keep their input order.
pub fn apply(products: &[Product], filters: &FilterState) -> Vec<Product> {
    let mut kept: Vec<Product> = products
        .iter()
        .filter(|product| filters.matches(product))
        .cloned()
        .collect();
    kept.sort_by(|a, b| filters.sort_key.compare(a, b));
    kept
}

/// Compares display names the way a user expects a catalog to be ordered:
/// case-insensitively first, lowercase before uppercase on ties.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded_a = a.chars().flat_map(char::to_lowercase);
    let folded_b = b.chars().flat_map(char::to_lowercase);
    folded_a.cmp(folded_b).then_with(|| {
        a.chars()
            .zip(b.chars())
            .find(|(x, y)| x != y)
            .map_or_else(|| a.len().cmp(&b.len()), |(x, y)| y.cmp(&x))
    })
}

/// A selectable value for one filter dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Facet {
    pub id: String,
    pub name: String,
}

/// Manufacturers present in the currently loaded page.
///
/// Only reflects what has been fetched: manufacturers that exist in the
/// catalog but not on this page are not offered. Pairs are de-duplicated by
/// id in first-seen order; a later name for the same id wins.
pub fn manufacturer_facets(products: &[Product]) -> Vec<Facet> {
    let mut facets: Vec<Facet> = Vec::new();
    for product in products {
        let (Some(id), Some(name)) = (&product.manufacturer_id, &product.manufacturer_name) else {
            continue;
        };
        if id.is_empty() || name.is_empty() {
            continue;
        }
        match facets.iter_mut().find(|facet| &facet.id == id) {
            Some(existing) => existing.name.clone_from(name),
            None => facets.push(Facet {
                id: id.clone(),
                name: name.clone(),
            }),
        }
    }
    facets
}

/// Product types offered as a filter; this list is static.
pub fn product_type_facets() -> Vec<Facet> {
    PRODUCT_TYPES
        .iter()
        .map(|ty| Facet {
            id: ty.id.to_string(),
            name: ty.label.to_string(),
        })
        .collect()
}
