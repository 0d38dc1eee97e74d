//! Auth command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Result, bail};
use storefront_core::api::signing::mask_token;
use storefront_core::auth::oauth::{self, TokenCache};
use storefront_core::auth::{AuthSession, LoginOptions};
use storefront_core::config::{CONSUMER_KEY_ENV, CONSUMER_SECRET_ENV, Config};
use tokio_util::sync::CancellationToken;

/// Set to skip opening a browser during `login`.
pub const NO_BROWSER_ENV: &str = "STOREFRONT_NO_BROWSER";

pub async fn status(session: &AuthSession) -> Result<()> {
    let base_url = session.client().base_url();
    let missing = session.client().credentials().missing();
    if !missing.is_empty() {
        println!("Not authenticated with {base_url}");
        println!("  Missing credentials: {}", missing.join(", "));
        println!("  Run `storefront login` or set them in the config file.");
        return Ok(());
    }

    let authenticated = session.check_status().await;
    if let Some(error) = session.state().error {
        bail!("Status check against {base_url} failed: {error}");
    }

    if authenticated {
        println!(
            "✓ Authenticated with {base_url} (token: {})",
            mask_token(&session.client().credentials().access_token)
        );
    } else {
        println!("Not authenticated with {base_url}");
        println!("  The store rejected the current credentials. Run `storefront login`.");
    }
    Ok(())
}

pub async fn login(session: &mut AuthSession, config: &Config, no_browser: bool) -> Result<()> {
    let credentials = session.client().credentials();
    if credentials.consumer_key.trim().is_empty() || credentials.consumer_secret.trim().is_empty()
    {
        bail!(
            "A consumer key and secret are required. Set {CONSUMER_KEY_ENV} and \
             {CONSUMER_SECRET_ENV}, or consumer_key/consumer_secret in [oauth]."
        );
    }

    let mut options = LoginOptions::from_config(&config.oauth);
    options.open_browser = !no_browser && std::env::var(NO_BROWSER_ENV).is_err();

    let base_url = session.client().base_url().to_string();
    if let Some(existing) = TokenCache::load_from(&options.cache_path)?.get(&base_url) {
        println!(
            "Already logged in to {base_url} (token: {})",
            mask_token(&existing.access_token)
        );
        if io::stdin().is_terminal() {
            print!("Do you want to replace the existing tokens? [y/N] ");
            io::stdout().flush()?;

            let mut response = String::new();
            io::stdin().lock().read_line(&mut response)?;
            if !response.trim().eq_ignore_ascii_case("y") {
                println!("Login cancelled.");
                return Ok(());
            }
        }
    }

    let authenticated = if oauth::is_loopback_callback(&options.callback_url) {
        login_with_listener(session, &options).await?
    } else {
        login_with_paste(session, &options).await?
    };

    println!();
    if authenticated {
        println!("✓ Logged in to {base_url}");
    } else {
        println!("Tokens were saved, but {base_url} did not accept them yet.");
    }
    println!("  Tokens saved to: {}", options.cache_path.display());
    Ok(())
}

async fn login_with_listener(session: &mut AuthSession, options: &LoginOptions) -> Result<bool> {
    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let result = session
        .login(options, &cancel, |url| {
            print_instructions(url);
            println!(
                "Waiting for the store to redirect back (up to {}s, Ctrl-C to cancel)...",
                options.timeout.as_secs()
            );
        })
        .await;
    ctrl_c.abort();
    result
}

async fn login_with_paste(session: &mut AuthSession, options: &LoginOptions) -> Result<bool> {
    let url = session.authorize_url(options, &options.callback_url);
    print_instructions(&url);

    // Try to open browser (best effort)
    if options.open_browser {
        let _ = open::that(&url);
    }

    print!("Paste the redirect URL (or the oauth_verifier value): ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    let Some(params) = oauth::parse_authorization_input(&input) else {
        bail!("Authorization verifier cannot be empty");
    };

    println!("Exchanging verifier for access tokens...");
    session.complete_login(options, &params).await
}

fn print_instructions(url: &str) {
    println!("To authorize this client:");
    println!();
    println!("  1. A browser window will open (or visit the URL below)");
    println!("  2. Log in to the store admin and approve access");
    println!("  3. You will be redirected back here when done");
    println!();
    println!("Authorization URL:");
    println!("  {url}");
    println!();
}

pub fn logout(session: &mut AuthSession) -> Result<()> {
    let cache_path = TokenCache::cache_path();
    let base_url = session.client().base_url().to_string();

    if session.logout(&cache_path)? {
        println!("✓ Logged out from {base_url}");
        println!("  Tokens removed from: {}", cache_path.display());
    } else {
        println!("Not logged in to {base_url} (no cached tokens found).");
    }
    Ok(())
}
