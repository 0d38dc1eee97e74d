//! Route dispatch: renders whatever screen a route string points at.

use anyhow::{Result, bail};
use storefront_core::auth::AuthSession;
use storefront_core::catalog::ProductListing;
use storefront_core::config::Config;
use storefront_core::routes::Route;

use super::{auth, product, products};

pub async fn run(session: &AuthSession, config: &Config, input: &str) -> Result<()> {
    let route = Route::parse(input);
    tracing::debug!(%route, "opening route");

    match &route {
        Route::Auth => auth::status(session).await,
        Route::Products { .. } => {
            let Some(listing) = ProductListing::from_route(&route) else {
                bail!("Cannot open {route}");
            };
            products::show(session.client(), listing, 1, config.effective_page_size()).await
        }
        Route::ProductDetail { id } => product::show(session.client(), id, true).await,
        Route::NotFound(path) => bail!("Page not found: {path}"),
    }
}
