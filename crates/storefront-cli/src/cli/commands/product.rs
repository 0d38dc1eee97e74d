//! Product detail.

use anyhow::{Context, Result};
use comfy_table::Cell;
use storefront_core::api::{ApiClient, DETAIL_FIELDS};
use storefront_core::catalog::Product;

use super::products::{products_table, status_cell};
use crate::cli::table::{flag_cell, header_cell, new_table, optional_cell};

pub async fn show(client: &ApiClient, id: &str, with_details: bool) -> Result<()> {
    let load: &[&str] = if with_details { DETAIL_FIELDS } else { &[] };
    let product = client
        .product(id, load)
        .await
        .with_context(|| format!("Failed to load product {}", id.trim()))?;

    println!("{}", product.name);
    println!("{}", detail_table(&product));

    if let Some(image) = &product.image_url {
        println!("Image: {image}");
    }
    if !product.image_gallery.is_empty() {
        println!("Gallery:");
        for url in &product.image_gallery {
            println!("  {url}");
        }
    }
    if !product.related.is_empty() {
        println!("Related products:");
        println!("{}", products_table(&product.related));
    }
    Ok(())
}

fn detail_table(product: &Product) -> comfy_table::Table {
    let mut table = new_table(&["Field", "Value"]);
    let rows = [
        ("ID", Cell::new(&product.id)),
        ("SKU", Cell::new(&product.sku_primary)),
        ("New SKU", optional_cell(product.sku_secondary.as_deref())),
        ("Status", status_cell(product.status)),
        ("Price", Cell::new(product.price_label())),
        (
            "Manufacturer",
            optional_cell(product.manufacturer_name.as_deref()),
        ),
        ("Model", optional_cell(product.model_name.as_deref())),
        ("Type", Cell::new(product.product_type_label())),
        ("Featured", flag_cell(product.featured)),
        ("Premium", flag_cell(product.premium)),
        ("End of life", flag_cell(product.end_of_life)),
    ];
    for (label, value) in rows {
        table.add_row(vec![header_cell(label), value]);
    }
    table
}
