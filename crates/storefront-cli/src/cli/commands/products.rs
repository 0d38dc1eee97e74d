//! Product listing.

use anyhow::{Result, bail};
use comfy_table::{Cell, CellAlignment, Color, Table};
use storefront_core::api::ApiClient;
use storefront_core::catalog::{Product, ProductListing, ProductStatus};

use crate::cli::table::{align_column, flag_cell, new_table, optional_cell};

/// Fetches one page for `listing` and prints the filtered result.
pub async fn show(
    client: &ApiClient,
    mut listing: ProductListing,
    page: u32,
    limit: u32,
) -> Result<()> {
    listing.load(client, Some(page), Some(limit)).await;
    if let Some(error) = listing.error() {
        bail!("Failed to load products: {error}");
    }

    match listing.category_id() {
        Some(id) => println!("Products in category {id} (page {page})"),
        None => println!("Products (page {page})"),
    }

    if listing.visible().is_empty() {
        if listing.products().is_empty() {
            println!("No products found.");
        } else {
            println!("No products match the current filters.");
        }
    } else {
        println!("{}", products_table(listing.visible()));
    }

    print_summary(&listing);
    Ok(())
}

pub fn products_table(products: &[Product]) -> Table {
    let mut table = new_table(&[
        "ID",
        "SKU",
        "Name",
        "Manufacturer",
        "Type",
        "Price",
        "Status",
        "Featured",
    ]);
    align_column(&mut table, 5, CellAlignment::Right);
    align_column(&mut table, 7, CellAlignment::Center);
    for product in products {
        table.add_row(vec![
            Cell::new(&product.id),
            Cell::new(product.display_sku()),
            Cell::new(&product.name),
            optional_cell(product.manufacturer_name.as_deref()),
            Cell::new(product.product_type_label()),
            Cell::new(product.price_label()),
            status_cell(product.status),
            flag_cell(product.featured),
        ]);
    }
    table
}

pub fn status_cell(status: ProductStatus) -> Cell {
    let color = match status {
        ProductStatus::InStock => Color::Green,
        ProductStatus::Unavailable => Color::Red,
    };
    Cell::new(status.label()).fg(color)
}

fn print_summary(listing: &ProductListing) {
    let loaded = listing.products().len();
    let shown = listing.visible().len();
    match listing.total_count() {
        Some(total) => println!("Showing {shown} of {loaded} loaded ({total} in catalog)"),
        None => println!("Showing {shown} of {loaded} loaded"),
    }

    let manufacturers = listing.manufacturer_facets();
    if !manufacturers.is_empty() {
        let names: Vec<String> = manufacturers
            .iter()
            .map(|facet| format!("{} ({})", facet.name, facet.id))
            .collect();
        println!("Manufacturers: {}", names.join(", "));
    }

    let filters = listing.filters();
    println!("Sort: {}", filters.sort_key.description());
    if filters.has_active_filters() {
        println!("Route: {}", listing.route());
    }
}
