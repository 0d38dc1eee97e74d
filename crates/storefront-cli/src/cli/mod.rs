//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use storefront_core::auth::AuthSession;
use storefront_core::catalog::model::parse_price;
use storefront_core::catalog::{FilterState, ProductListing, SortKey};
use storefront_core::{config, logging};

mod commands;
mod table;

#[derive(Parser)]
#[command(name = "storefront")]
#[command(version)]
#[command(about = "Browse a storefront catalog from the terminal")]
struct Cli {
    /// Store base URL (overrides STOREFRONT_BASE_URL and [api] base_url)
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Check whether the store accepts the current credentials
    Status,

    /// Authorize this client against the store
    Login {
        /// Print the authorization URL without opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Forget the cached access tokens for the store
    Logout,

    /// List top-level categories, or the children of one category
    Categories {
        /// Parent category ID
        #[arg(value_name = "ID")]
        id: Option<String>,
    },

    /// Browse the category tree interactively
    Browse,

    /// List products with client-side filters
    Products(ProductsArgs),

    /// Show one product
    Product {
        /// Product ID
        #[arg(value_name = "ID")]
        id: String,

        /// Skip the image gallery and related products
        #[arg(long)]
        brief: bool,
    },

    /// Open a route such as `/products?category_id=12&sortBy=price_asc`
    Open {
        #[arg(value_name = "ROUTE")]
        route: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct ProductsArgs {
    /// Restrict to one category
    #[arg(long, value_name = "ID")]
    category_id: Option<String>,

    /// Case-insensitive text matched against the product name
    #[arg(long, short)]
    search: Option<String>,

    /// Manufacturer IDs (comma-separated or repeated)
    #[arg(long, value_name = "ID", value_delimiter = ',')]
    manufacturer: Vec<String>,

    /// Product type IDs (comma-separated or repeated)
    #[arg(long, value_name = "ID", value_delimiter = ',')]
    product_type: Vec<String>,

    /// Only featured products
    #[arg(long)]
    featured: bool,

    /// Only premium products
    #[arg(long)]
    premium: bool,

    #[arg(long, value_name = "PRICE", value_parser = parse_price_arg)]
    min_price: Option<Decimal>,

    #[arg(long, value_name = "PRICE", value_parser = parse_price_arg)]
    max_price: Option<Decimal>,

    /// name_asc, name_desc, price_asc, price_desc or newest
    #[arg(long, value_name = "KEY")]
    sort: Option<SortKey>,

    /// Page to fetch (1-based)
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Page size (default: config page_size)
    #[arg(long)]
    limit: Option<u32>,
}

fn parse_price_arg(value: &str) -> Result<Decimal, String> {
    parse_price(value).ok_or_else(|| format!("'{value}' is not a price"))
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Generate a fresh config from Rust defaults
    Generate,
    /// Save the default page size for product listings
    PageSize {
        #[arg(value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        size: u32,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load().context("load config")?;
    let _log_guard = logging::init(&config::paths::logs_dir(), config.effective_log_level())
        .context("init logging")?;

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli, config).await })
}

async fn dispatch(cli: Cli, config: config::Config) -> Result<()> {
    let Cli { base_url, command } = cli;
    let base_url = base_url.as_deref();

    match command {
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
            ConfigCommands::PageSize { size } => commands::config::page_size(size),
        },

        Commands::Status => commands::auth::status(&open_session(&config, base_url)?).await,
        Commands::Login { no_browser } => {
            let mut session = open_session(&config, base_url)?;
            commands::auth::login(&mut session, &config, no_browser).await
        }
        Commands::Logout => commands::auth::logout(&mut open_session(&config, base_url)?),

        Commands::Categories { id } => {
            let session = open_session(&config, base_url)?;
            commands::categories::list(session.client(), id.as_deref()).await
        }
        Commands::Browse => {
            let session = open_session(&config, base_url)?;
            commands::categories::browse(session.client(), &config).await
        }
        Commands::Products(args) => {
            let session = open_session(&config, base_url)?;
            let limit = args.limit.unwrap_or_else(|| config.effective_page_size());
            commands::products::show(session.client(), args.listing(), args.page, limit).await
        }
        Commands::Product { id, brief } => {
            let session = open_session(&config, base_url)?;
            commands::product::show(session.client(), &id, !brief).await
        }
        Commands::Open { route } => {
            let session = open_session(&config, base_url)?;
            commands::open::run(&session, &config, &route).await
        }
    }
}

fn open_session(config: &config::Config, base_url: Option<&str>) -> Result<AuthSession> {
    let session = AuthSession::from_config(config, base_url)?;
    tracing::debug!(base_url = session.client().base_url(), "session started");
    Ok(session)
}

impl ProductsArgs {
    fn listing(&self) -> ProductListing {
        let filters = FilterState {
            search_text: self.search.clone().unwrap_or_default(),
            manufacturer_ids: self.manufacturer.iter().cloned().collect(),
            product_type_ids: self.product_type.iter().cloned().collect(),
            featured_only: self.featured,
            premium_only: self.premium,
            price_min: self.min_price,
            price_max: self.max_price,
            sort_key: self.sort.unwrap_or_default(),
        };
        ProductListing::new(self.category_id.clone(), filters)
    }
}
