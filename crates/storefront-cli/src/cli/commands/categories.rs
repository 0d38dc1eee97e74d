//! Category listing and interactive drill-down.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use comfy_table::CellAlignment;
use storefront_core::api::ApiClient;
use storefront_core::catalog::{Category, CategoryBrowser, CategoryNavigator, ProductListing};
use storefront_core::config::Config;
use storefront_core::routes::Route;

use super::products;
use crate::cli::table::{align_column, dim_cell, flag_cell, new_table};

pub async fn list(client: &ApiClient, id: Option<&str>) -> Result<()> {
    let categories = match id {
        Some(id) => client.category_children(id).await?,
        None => client.categories().await?,
    };

    if categories.is_empty() {
        println!("No categories found.");
        return Ok(());
    }
    println!("{}", categories_table(&categories));
    Ok(())
}

fn categories_table(categories: &[Category]) -> comfy_table::Table {
    let mut table = new_table(&["#", "ID", "Name", "Active", "Subcategories"]);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    align_column(&mut table, 4, CellAlignment::Center);
    for (idx, category) in categories.iter().enumerate() {
        table.add_row(vec![
            dim_cell(idx + 1),
            comfy_table::Cell::new(&category.id),
            comfy_table::Cell::new(&category.name),
            flag_cell(category.is_active),
            flag_cell(category.has_children),
        ]);
    }
    table
}

/// One line of input in the browse loop.
#[derive(Debug, PartialEq, Eq)]
enum BrowseInput {
    Enter(usize),
    Back,
    Root,
    Retry,
    Quit,
    Help,
}

fn parse_input(line: &str) -> Option<BrowseInput> {
    let line = line.trim();
    match line.to_ascii_lowercase().as_str() {
        "b" | "back" => Some(BrowseInput::Back),
        "r" | "root" => Some(BrowseInput::Root),
        "retry" => Some(BrowseInput::Retry),
        "q" | "quit" | "exit" => Some(BrowseInput::Quit),
        "?" | "h" | "help" => Some(BrowseInput::Help),
        other => other
            .parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .map(BrowseInput::Enter),
    }
}

pub async fn browse(client: &ApiClient, config: &Config) -> Result<()> {
    let mut browser = CategoryBrowser::new(client.clone());
    browser.load_root().await;
    render(browser.navigator());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let Some(input) = parse_input(&line) else {
            if !line.trim().is_empty() {
                println!("Unknown command '{}'. Type ? for help.", line.trim());
            }
            continue;
        };

        match input {
            BrowseInput::Quit => break,
            BrowseInput::Help => print_help(),
            BrowseInput::Back => {
                if browser.navigator().is_root() {
                    println!("Already at the top level.");
                    continue;
                }
                browser.back().await;
                render(browser.navigator());
            }
            BrowseInput::Root => {
                browser.root().await;
                render(browser.navigator());
            }
            BrowseInput::Retry => {
                browser.retry().await;
                render(browser.navigator());
            }
            BrowseInput::Enter(n) => {
                let Some(category) = browser.navigator().categories().get(n - 1).cloned() else {
                    println!("No category #{n}.");
                    continue;
                };
                match browser.enter(&category).await {
                    Some(route) => show_leaf(client, config, &route).await?,
                    None => render(browser.navigator()),
                }
            }
        }
    }
    Ok(())
}

async fn show_leaf(client: &ApiClient, config: &Config, route: &Route) -> Result<()> {
    println!("Opening {route}");
    let Some(listing) = ProductListing::from_route(route) else {
        return Ok(());
    };
    // A failed listing is reported but keeps the browse session alive.
    if let Err(err) = products::show(client, listing, 1, config.effective_page_size()).await {
        println!("{err:#}");
    }
    Ok(())
}

fn render(navigator: &CategoryNavigator) {
    println!();
    println!("{}", breadcrumb(navigator));
    if let Some(error) = navigator.error() {
        println!("Error: {error}");
        println!("Type `retry` to try again.");
    }
    if navigator.categories().is_empty() {
        if navigator.error().is_none() {
            println!("No categories found.");
        }
    } else {
        println!("{}", categories_table(navigator.categories()));
    }
    println!("Enter a number to open a category, b = back, r = root, q = quit.");
}

fn breadcrumb(navigator: &CategoryNavigator) -> String {
    let mut parts = vec!["Categories"];
    parts.extend(navigator.path().iter().map(|crumb| crumb.name.as_str()));
    parts.join(" › ")
}

fn print_help() {
    println!("Commands:");
    println!("  <number>  open category (leaf categories show their products)");
    println!("  b         back to the parent category");
    println!("  r         back to the top level");
    println!("  retry     reload the current level");
    println!("  q         quit");
}
