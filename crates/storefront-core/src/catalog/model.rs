//! Strictly typed catalog model.
//!
//! Everything in here has already been normalized by the API client
//! (see `api::wire`); no loosely typed payload values reach this layer.

use std::str::FromStr;

use rust_decimal::Decimal;

/// Placeholder rendered when a product has no usable price.
pub const MISSING_PRICE: &str = "—";

/// A node of the category tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub is_active: bool,
    pub url_key: String,
    /// Leaf categories navigate to a product listing instead of drilling down.
    pub has_children: bool,
}

/// One breadcrumb entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCrumb {
    pub id: String,
    pub name: String,
}

impl From<&Category> for CategoryCrumb {
    fn from(category: &Category) -> Self {
        Self {
            id: category.id.clone(),
            name: category.name.clone(),
        }
    }
}

/// Stock status as reported by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductStatus {
    InStock,
    #[default]
    Unavailable,
}

impl ProductStatus {
    pub fn label(self) -> &'static str {
        match self {
            ProductStatus::InStock => "In Stock",
            ProductStatus::Unavailable => "Unavailable",
        }
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Product {
    pub id: String,
    pub sku_primary: String,
    pub sku_secondary: Option<String>,
    pub status: ProductStatus,
    pub name: String,
    /// Normalized price; `None` when the payload had no parseable price.
    pub price: Option<Decimal>,
    pub manufacturer_id: Option<String>,
    pub manufacturer_name: Option<String>,
    pub model_name: Option<String>,
    pub product_type_id: String,
    pub featured: bool,
    pub premium: bool,
    pub end_of_life: bool,
    pub image_url: Option<String>,
    /// Only populated by the detail endpoint when `image_gallery` is loaded.
    pub image_gallery: Vec<String>,
    /// Only populated by the detail endpoint when `related_product` is loaded.
    pub related: Vec<Product>,
}

impl Product {
    /// SKU shown to users: the secondary ("new") SKU wins when present.
    pub fn display_sku(&self) -> &str {
        self.sku_secondary
            .as_deref()
            .filter(|sku| !sku.is_empty())
            .unwrap_or(&self.sku_primary)
    }

    /// Price used for filtering and sorting. Missing prices count as zero.
    pub fn sort_price(&self) -> Decimal {
        self.price.unwrap_or(Decimal::ZERO)
    }

    /// Numeric id used by the "newest" ordering. Non-numeric ids count as zero.
    pub fn numeric_id(&self) -> u64 {
        self.id.trim().parse().unwrap_or(0)
    }

    pub fn price_label(&self) -> String {
        format_price(self.price)
    }

    pub fn product_type_label(&self) -> &'static str {
        product_type_label(&self.product_type_id)
    }
}

/// Pagination metadata returned next to a product page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageInfo {
    pub current_page: Option<u32>,
    pub page_size: Option<u32>,
    pub total_pages: Option<u32>,
}

/// One page of products as returned by `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total_count: Option<u64>,
    pub page_info: Option<PageInfo>,
}

/// Known product types (attribute sets) with display labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductType {
    pub id: &'static str,
    pub label: &'static str,
}

pub const PRODUCT_TYPES: &[ProductType] = &[
    ProductType { id: "4", label: "Parts" },
    ProductType { id: "10", label: "Devicesystem" },
    ProductType { id: "12", label: "Macbook Parts" },
    ProductType { id: "13", label: "Game Console" },
    ProductType { id: "14", label: "Battery" },
    ProductType { id: "17", label: "Tools" },
    ProductType { id: "20", label: "Accessories" },
];

/// Returns the label for a product type id, `"Other"` for unknown ids.
pub fn product_type_label(id: &str) -> &'static str {
    PRODUCT_TYPES
        .iter()
        .find(|ty| ty.id == id)
        .map_or("Other", |ty| ty.label)
}

/// Parses a textual price into a normalized decimal.
///
/// Accepts plain decimals (`"89.990"`) and scientific notation (`"8.999e1"`).
/// Trailing zeros are stripped so equal amounts compare and print equally.
pub fn parse_price(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
        .map(|price| price.normalize())
}

/// Renders a price for display; missing prices render as [`MISSING_PRICE`].
pub fn format_price(price: Option<Decimal>) -> String {
    match price {
        Some(price) => format!("${:.2}", price.round_dp(2)),
        None => MISSING_PRICE.to_string(),
    }
}
