//! Normalization of loosely typed catalog payloads.
//!
//! The remote catalog is inconsistent about types: ids arrive as strings or
//! numbers, flags as booleans, numbers, or `"0"`/`"1"`, prices as strings or
//! numbers, and list endpoints return either arrays or objects keyed by
//! entity id. Everything is converted here into the strict types of
//! [`crate::catalog::model`]; nothing loosely typed escapes this module.
//!
//! List decoders skip malformed entries (logged at `warn`) instead of
//! failing the whole page.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

use super::CatalogError;
use crate::catalog::model::{Category, PageInfo, Product, ProductPage, ProductStatus, parse_price};

// ============================================================================
// Scalar coercions
// ============================================================================

/// Reads a string or number as a trimmed, non-empty string.
pub(crate) fn flex_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads a boolean-ish flag: `true`, non-zero numbers, `"1"`, `"true"`.
pub(crate) fn flex_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => {
            let s = s.trim();
            s == "1" || s.eq_ignore_ascii_case("true")
        }
        _ => false,
    }
}

/// Reads a price given as a string or a number.
pub(crate) fn flex_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => parse_price(s),
        Value::Number(n) => parse_price(&n.to_string()),
        _ => None,
    }
}

fn flex_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn flex_u32(value: &Value) -> Option<u32> {
    flex_u64(value).and_then(|n| u32::try_from(n).ok())
}

/// Flattens a list payload: arrays as-is, keyed objects by value.
fn list_entries(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) if map.values().all(Value::is_object) => {
            Some(map.into_iter().map(|(_, v)| v).collect())
        }
        _ => None,
    }
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireCategory {
    entity_id: Value,
    name: Value,
    is_active: Value,
    url_key: Value,
    has_children: Value,
    children: Value,
}

impl WireCategory {
    fn into_category(self) -> Option<Category> {
        let id = flex_string(&self.entity_id)?;
        let has_children = flex_bool(&self.has_children)
            || self.children.as_array().is_some_and(|c| !c.is_empty());
        Some(Category {
            id,
            name: flex_string(&self.name).unwrap_or_default(),
            is_active: flex_bool(&self.is_active),
            url_key: flex_string(&self.url_key).unwrap_or_default(),
            has_children,
        })
    }
}

fn decode_category_entry(entry: Value) -> Option<Category> {
    let category = serde_json::from_value::<WireCategory>(entry)
        .ok()
        .and_then(WireCategory::into_category);
    if category.is_none() {
        warn!("skipping malformed category entry");
    }
    category
}

/// Decodes a category list.
///
/// Accepts an array, an object keyed by entity id, or a single category
/// object carrying its `children`.
pub(crate) fn decode_categories(value: Value) -> Result<Vec<Category>, CatalogError> {
    let entries = match value {
        Value::Object(mut map) if map.contains_key("entity_id") => match map.remove("children") {
            Some(children) => list_entries(children).unwrap_or_default(),
            None => Vec::new(),
        },
        other => list_entries(other)
            .ok_or_else(|| CatalogError::decode("expected a list of categories"))?,
    };

    Ok(entries.into_iter().filter_map(decode_category_entry).collect())
}

// ============================================================================
// Products
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WireProduct {
    entity_id: Value,
    sku: Value,
    new_sku: Value,
    status: Value,
    name: Value,
    price: Value,
    manufacturer: Value,
    manufacturer_text: Value,
    model_text: Value,
    attribute_set_id: Value,
    featured: Value,
    premium: Value,
    end_of_life: Value,
    default_image: Value,
    image_gallery: Value,
    related_product: Value,
}

impl WireProduct {
    fn into_product(self) -> Option<Product> {
        let id = flex_string(&self.entity_id)?;
        let in_stock = self.status == Value::Bool(true)
            || flex_string(&self.status).as_deref() == Some("1");
        let status = if in_stock {
            ProductStatus::InStock
        } else {
            ProductStatus::Unavailable
        };

        Some(Product {
            id,
            sku_primary: flex_string(&self.sku).unwrap_or_default(),
            sku_secondary: flex_string(&self.new_sku),
            status,
            name: flex_string(&self.name).unwrap_or_default(),
            price: flex_decimal(&self.price),
            manufacturer_id: flex_string(&self.manufacturer),
            manufacturer_name: flex_string(&self.manufacturer_text),
            model_name: flex_string(&self.model_text),
            product_type_id: flex_string(&self.attribute_set_id).unwrap_or_default(),
            featured: flex_bool(&self.featured),
            premium: flex_bool(&self.premium),
            end_of_life: flex_bool(&self.end_of_life),
            image_url: flex_string(&self.default_image),
            image_gallery: decode_gallery(self.image_gallery),
            related: list_entries(self.related_product)
                .map(|entries| entries.into_iter().filter_map(decode_product_entry).collect())
                .unwrap_or_default(),
        })
    }
}

/// Gallery entries are either plain URLs or objects with a `url`/`file` field.
fn decode_gallery(value: Value) -> Vec<String> {
    let entries = match value {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        _ => return Vec::new(),
    };

    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::Object(obj) => gallery_url(obj),
            other => flex_string(other),
        })
        .collect()
}

fn gallery_url(obj: &Map<String, Value>) -> Option<String> {
    ["url", "file", "image"]
        .iter()
        .find_map(|key| obj.get(*key).and_then(flex_string))
}

fn decode_product_entry(entry: Value) -> Option<Product> {
    let product = serde_json::from_value::<WireProduct>(entry)
        .ok()
        .and_then(WireProduct::into_product);
    if product.is_none() {
        warn!("skipping malformed product entry");
    }
    product
}

/// Decodes a single product (detail endpoint).
pub(crate) fn decode_product(value: Value) -> Result<Product, CatalogError> {
    if !value.is_object() {
        return Err(CatalogError::decode("expected a product object"));
    }
    serde_json::from_value::<WireProduct>(value)
        .map_err(|e| CatalogError::decode(e.to_string()))?
        .into_product()
        .ok_or_else(|| CatalogError::decode("product is missing entity_id"))
}

/// Decodes a product page.
///
/// Accepts `{items, total_count?, page_info?}`, a bare array, or an object
/// keyed by entity id.
pub(crate) fn decode_product_page(value: Value) -> Result<ProductPage, CatalogError> {
    match value {
        Value::Object(mut map) if map.contains_key("items") => {
            let items = map
                .remove("items")
                .and_then(list_entries)
                .ok_or_else(|| CatalogError::decode("`items` is not a list"))?;
            let total_count = map.get("total_count").and_then(flex_u64);
            let page_info = map.get("page_info").and_then(Value::as_object).map(|info| PageInfo {
                current_page: info.get("current_page").and_then(flex_u32),
                page_size: info.get("page_size").and_then(flex_u32),
                total_pages: info.get("total_pages").and_then(flex_u32),
            });
            Ok(ProductPage {
                items: items.into_iter().filter_map(decode_product_entry).collect(),
                total_count,
                page_info,
            })
        }
        other => {
            let items = list_entries(other)
                .ok_or_else(|| CatalogError::decode("expected a list of products"))?;
            Ok(ProductPage {
                items: items.into_iter().filter_map(decode_product_entry).collect(),
                total_count: None,
                page_info: None,
            })
        }
    }
}
