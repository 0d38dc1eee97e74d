//! Authentication state.
//!
//! [`AuthSession`] owns the API client for the length of a session and
//! publishes [`AuthState`] through a `watch` channel. Status checks are
//! tagged with request tokens so a slow, superseded check can never
//! overwrite the result of a newer one.

pub mod oauth;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use self::oauth::{
    AuthorizeParams, CachedTokens, CallbackListener, CallbackParams, TokenCache,
    build_authorize_url,
};
use crate::api::{ApiClient, OAuthCredentials};
use crate::config::{self, ACCESS_TOKEN_ENV, ACCESS_TOKEN_SECRET_ENV, Config, OAuthConfig};
use crate::request::RequestTracker;

/// Observable authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub authenticated: bool,
    pub loading: bool,
    pub error: Option<String>,
}

/// Settings for the authorization handshake.
#[derive(Debug, Clone)]
pub struct LoginOptions {
    pub authorize_path: String,
    pub token_path: String,
    pub auth_type: String,
    pub callback_url: String,
    pub timeout: Duration,
    /// Where the obtained tokens are cached.
    pub cache_path: PathBuf,
    /// Open the authorize URL in a browser.
    pub open_browser: bool,
}

impl LoginOptions {
    pub fn from_config(oauth: &OAuthConfig) -> Self {
        Self {
            authorize_path: oauth.authorize_path.clone(),
            token_path: oauth.token_path.clone(),
            auth_type: oauth.auth_type.clone(),
            callback_url: oauth
                .effective_callback_url()
                .unwrap_or("http://127.0.0.1:0/callback")
                .to_string(),
            timeout: oauth.login_timeout(),
            cache_path: TokenCache::cache_path(),
            open_browser: true,
        }
    }
}

/// Resolves signing credentials.
///
/// Consumer key/secret: env > config. Access token/secret: env > token
/// cache > config.
pub fn resolve_credentials(
    oauth: &OAuthConfig,
    cached: Option<&CachedTokens>,
) -> OAuthCredentials {
    let pick = |env: &str, cached: Option<&str>, configured: Option<&str>| {
        config::env_value(env)
            .or_else(|| cached.filter(|v| !v.is_empty()).map(str::to_string))
            .or_else(|| {
                configured
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_default()
    };

    OAuthCredentials {
        consumer_key: oauth.effective_consumer_key().unwrap_or_default(),
        consumer_secret: oauth.effective_consumer_secret().unwrap_or_default(),
        access_token: pick(
            ACCESS_TOKEN_ENV,
            cached.map(|c| c.access_token.as_str()),
            oauth.access_token.as_deref(),
        ),
        access_token_secret: pick(
            ACCESS_TOKEN_SECRET_ENV,
            cached.map(|c| c.access_token_secret.as_str()),
            oauth.access_token_secret.as_deref(),
        ),
    }
}

/// Session-scoped authentication context.
#[derive(Debug)]
pub struct AuthSession {
    client: ApiClient,
    state: watch::Sender<AuthState>,
    requests: RequestTracker,
}

impl AuthSession {
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            client,
            state,
            requests: RequestTracker::new(),
        }
    }

    /// Builds a session from config, the token cache and an optional base URL
    /// override.
    pub fn from_config(config: &Config, base_url_override: Option<&str>) -> Result<Self> {
        let base_url = match base_url_override.map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None => config.effective_base_url()?,
        };
        let cache = TokenCache::load()?;
        let credentials = resolve_credentials(&config.oauth, cache.get(&base_url));
        let client = ApiClient::new(&base_url, credentials, config.request_timeout())
            .context("Failed to create API client")?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Current state snapshot.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Probes the API and records whether we are authenticated.
    ///
    /// Returns the probe's answer (false on error). The shared state is only
    /// updated if no newer check was started in the meantime.
    pub async fn check_status(&self) -> bool {
        let token = self.requests.issue();
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        let result = self.client.status_probe().await;

        let authenticated = match &result {
            Ok(authenticated) => *authenticated,
            Err(_) => false,
        };
        if !self.requests.is_latest(token) {
            debug!(token = token.value(), "discarding stale status check");
            return authenticated;
        }

        self.state.send_modify(|state| {
            state.loading = false;
            state.authenticated = authenticated;
            state.error = result.as_ref().err().map(ToString::to_string);
        });
        match &result {
            Ok(true) => info!("authenticated"),
            Ok(false) => info!("not authenticated"),
            Err(err) => warn!(error = %err, "status check failed"),
        }
        authenticated
    }

    /// Builds the authorize URL for `callback_url`.
    pub fn authorize_url(&self, options: &LoginOptions, callback_url: &str) -> String {
        let credentials = self.client.credentials();
        build_authorize_url(&AuthorizeParams {
            base_url: self.client.base_url(),
            authorize_path: &options.authorize_path,
            consumer_key: &credentials.consumer_key,
            token: &credentials.access_token,
            callback_url,
            auth_type: &options.auth_type,
        })
    }

    /// Runs the full handshake over a loopback callback.
    ///
    /// `on_authorize_url` is called with the URL the user has to visit
    /// before the listener starts waiting. Returns the final status.
    pub async fn login(
        &mut self,
        options: &LoginOptions,
        cancel: &CancellationToken,
        on_authorize_url: impl FnOnce(&str),
    ) -> Result<bool> {
        self.begin_login();
        let result = self.run_login(options, cancel, on_authorize_url).await;
        self.finish_login(result).await
    }

    /// Completes the handshake with callback parameters obtained out of band
    /// (pasted redirect URL).
    pub async fn complete_login(
        &mut self,
        options: &LoginOptions,
        params: &CallbackParams,
    ) -> Result<bool> {
        self.begin_login();
        let result = self.exchange_and_store(options, params).await;
        self.finish_login(result).await
    }

    /// Forgets cached tokens for this store and resets the state.
    ///
    /// Returns whether cached tokens existed. Tokens supplied through config
    /// or env are not touched on disk but are dropped from this session.
    pub fn logout(&mut self, cache_path: &std::path::Path) -> Result<bool> {
        let mut cache = TokenCache::load_from(cache_path)?;
        let had_tokens = cache.remove(self.client.base_url()).is_some();
        if had_tokens {
            cache.save_to(cache_path)?;
        }

        let mut credentials = self.client.credentials().clone();
        credentials.access_token.clear();
        credentials.access_token_secret.clear();
        self.client.set_credentials(credentials);
        self.state.send_replace(AuthState::default());
        info!(had_tokens, "logged out");
        Ok(had_tokens)
    }

    fn begin_login(&self) {
        // Supersede any in-flight status check.
        self.requests.issue();
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
    }

    async fn finish_login(&mut self, result: Result<()>) -> Result<bool> {
        match result {
            Ok(()) => Ok(self.check_status().await),
            Err(err) => {
                let message = format!("{err:#}");
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(message);
                });
                Err(err)
            }
        }
    }

    async fn run_login(
        &mut self,
        options: &LoginOptions,
        cancel: &CancellationToken,
        on_authorize_url: impl FnOnce(&str),
    ) -> Result<()> {
        let listener = CallbackListener::bind(&options.callback_url).await?;
        let url = self.authorize_url(options, listener.redirect_uri());
        on_authorize_url(&url);

        if options.open_browser
            && let Err(err) = open::that(&url)
        {
            debug!(error = %err, "could not open browser");
        }

        let params = listener.wait(options.timeout, cancel).await?;
        self.exchange_and_store(options, &params).await
    }

    async fn exchange_and_store(
        &mut self,
        options: &LoginOptions,
        params: &CallbackParams,
    ) -> Result<()> {
        let current = self.client.credentials().clone();
        let request_token = params.token.as_deref().unwrap_or(&current.access_token);
        let token_url = format!("{}{}", self.client.base_url(), options.token_path);

        let tokens = oauth::exchange_verifier(
            &token_url,
            &current,
            request_token,
            &current.access_token_secret,
            &params.verifier,
        )
        .await?;

        let mut cache = TokenCache::load_from(&options.cache_path)?;
        cache.set(self.client.base_url(), tokens.clone());
        cache.save_to(&options.cache_path)?;
        info!(path = %options.cache_path.display(), "saved access tokens");

        self.client.set_credentials(OAuthCredentials {
            access_token: tokens.access_token,
            access_token_secret: tokens.access_token_secret,
            ..current
        });
        Ok(())
    }
}
