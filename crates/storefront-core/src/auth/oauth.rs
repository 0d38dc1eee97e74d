//! OAuth 1.0a authorization handshake and token storage.
//!
//! Access tokens obtained by `login` are stored in `<base>/oauth.json` with
//! restricted permissions (0600), keyed by store base URL. Tokens are never
//! logged or displayed in full.

use std::collections::BTreeMap;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::signing::{self, OAuthCredentials, mask_token};
use crate::config::{FileAccess, paths, write_atomic};

/// OAuth token cache filename.
const OAUTH_CACHE_FILE: &str = "oauth.json";

/// Callback path used when the configured callback URL has none.
pub const DEFAULT_CALLBACK_PATH: &str = "/callback";

/// How long one callback connection may stay silent before it is dropped.
const CALLBACK_READ_TIMEOUT: Duration = Duration::from_secs(5);

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Access token pair for one store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedTokens {
    pub access_token: String,
    pub access_token_secret: String,
    /// Seconds since epoch when the pair was obtained.
    #[serde(default)]
    pub obtained_at: u64,
}

impl CachedTokens {
    pub fn new(access_token: String, access_token_secret: String) -> Self {
        Self {
            access_token,
            access_token_secret,
            obtained_at: now_secs(),
        }
    }
}

impl std::fmt::Debug for CachedTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedTokens")
            .field("access_token", &mask_token(&self.access_token))
            .field("access_token_secret", &"***")
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// OAuth token cache structure. Maps store base URLs to token pairs.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TokenCache {
    #[serde(flatten)]
    pub stores: BTreeMap<String, CachedTokens>,
}

impl TokenCache {
    /// Returns the path to the OAuth cache file.
    pub fn cache_path() -> PathBuf {
        paths::storefront_home().join(OAUTH_CACHE_FILE)
    }

    /// Loads the cache from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::cache_path())
    }

    /// Loads the cache from `path`. Returns an empty cache if the file
    /// doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read OAuth cache from {}", path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse OAuth cache from {}", path.display()))
    }

    /// Saves the cache to `path` with restricted permissions (0600).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize OAuth cache")?;
        write_atomic(path, &contents, FileAccess::Private)
    }

    pub fn get(&self, base_url: &str) -> Option<&CachedTokens> {
        self.stores.get(&store_key(base_url))
    }

    pub fn set(&mut self, base_url: &str, tokens: CachedTokens) {
        self.stores.insert(store_key(base_url), tokens);
    }

    pub fn remove(&mut self, base_url: &str) -> Option<CachedTokens> {
        self.stores.remove(&store_key(base_url))
    }
}

fn store_key(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Parameters of the authorize URL.
#[derive(Debug, Clone)]
pub struct AuthorizeParams<'a> {
    pub base_url: &'a str,
    pub authorize_path: &'a str,
    pub consumer_key: &'a str,
    pub token: &'a str,
    pub callback_url: &'a str,
    pub auth_type: &'a str,
}

/// Builds the URL the user visits to authorize access.
pub fn build_authorize_url(params: &AuthorizeParams<'_>) -> String {
    let query: String = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs([
            ("oauth_consumer_key", params.consumer_key),
            ("oauth_token", params.token),
            ("oauth_callback", params.callback_url),
            ("auth_type", params.auth_type),
        ])
        .finish();

    format!(
        "{}{}?{query}",
        params.base_url.trim_end_matches('/'),
        params.authorize_path
    )
}

/// What the store hands back after the user authorizes.
#[derive(Clone, PartialEq, Eq)]
pub struct CallbackParams {
    pub token: Option<String>,
    pub verifier: String,
}

impl std::fmt::Debug for CallbackParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackParams")
            .field("token", &self.token.as_deref().map(mask_token))
            .field("verifier", &"***")
            .finish()
    }
}

/// Extracts `oauth_token`/`oauth_verifier` from query pairs.
fn params_from_query(query: &str) -> Option<CallbackParams> {
    let mut token = None;
    let mut verifier = None;
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "oauth_token" if !value.is_empty() => token = Some(value.into_owned()),
            "oauth_verifier" if !value.is_empty() => verifier = Some(value.into_owned()),
            _ => {}
        }
    }
    verifier.map(|verifier| CallbackParams { token, verifier })
}

/// Parses pasted authorization input: a full redirect URL, a raw query
/// string, or a bare verifier.
pub fn parse_authorization_input(input: &str) -> Option<CallbackParams> {
    let value = input.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(url) = url::Url::parse(value) {
        return url.query().and_then(params_from_query);
    }

    if value.contains("oauth_verifier=") {
        return params_from_query(value.trim_start_matches('?'));
    }

    Some(CallbackParams {
        token: None,
        verifier: value.to_string(),
    })
}

/// True if `callback_url` points at this machine.
pub fn is_loopback_callback(callback_url: &str) -> bool {
    let Ok(url) = url::Url::parse(callback_url) else {
        return false;
    };
    match url.host_str() {
        Some("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback()),
        None => false,
    }
}

/// One-shot HTTP listener for the authorization redirect.
#[derive(Debug)]
pub struct CallbackListener {
    listener: TcpListener,
    redirect_uri: String,
    path: String,
    read_timeout: Duration,
}

impl CallbackListener {
    /// Binds to the host/port of a loopback `callback_url`. Port 0 (or no
    /// port) picks a free port; [`Self::redirect_uri`] reports the real one.
    pub async fn bind(callback_url: &str) -> Result<Self> {
        if !is_loopback_callback(callback_url) {
            bail!("Callback URL {callback_url} is not a loopback address");
        }
        let mut url = url::Url::parse(callback_url)
            .with_context(|| format!("Invalid callback URL: {callback_url}"))?;

        let host = url.host_str().unwrap_or("127.0.0.1");
        let ip: IpAddr = if host == "localhost" {
            IpAddr::from([127, 0, 0, 1])
        } else {
            host.trim_start_matches('[')
                .trim_end_matches(']')
                .parse()
                .with_context(|| format!("Invalid callback host: {host}"))?
        };
        let port = url.port().unwrap_or(0);

        let listener = TcpListener::bind(SocketAddr::new(ip, port))
            .await
            .with_context(|| format!("Failed to listen on {ip}:{port}"))?;
        let bound = listener
            .local_addr()
            .context("Failed to read callback listener address")?;

        if url.set_port(Some(bound.port())).is_err() {
            bail!("Cannot set port on callback URL {callback_url}");
        }
        let path = match url.path() {
            "" | "/" => DEFAULT_CALLBACK_PATH.to_string(),
            path => path.to_string(),
        };
        url.set_path(&path);
        url.set_query(None);

        debug!(addr = %bound, %path, "callback listener bound");
        Ok(Self {
            listener,
            redirect_uri: url.to_string(),
            path,
            read_timeout: CALLBACK_READ_TIMEOUT,
        })
    }

    /// The URL the store should redirect to.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Waits for the redirect carrying the verifier.
    ///
    /// Requests to other paths (favicon probes) are answered with 404 and
    /// ignored, connections that stay silent are dropped. Fails on timeout
    /// or cancellation.
    pub async fn wait(
        self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<CallbackParams> {
        tokio::select! {
            () = cancel.cancelled() => bail!("Login cancelled"),
            result = tokio::time::timeout(timeout, self.accept_loop()) => match result {
                Ok(params) => params,
                Err(_) => bail!(
                    "Timed out after {}s waiting for the authorization callback",
                    timeout.as_secs()
                ),
            },
        }
    }

    async fn accept_loop(&self) -> Result<CallbackParams> {
        loop {
            let (mut stream, peer) = self
                .listener
                .accept()
                .await
                .context("Failed to accept callback connection")?;

            // Browsers preconnect idle sockets; never block on one.
            let mut buffer = [0u8; 4096];
            let read = tokio::time::timeout(self.read_timeout, stream.read(&mut buffer)).await;
            let read = match read {
                Ok(Ok(read)) => read,
                Ok(Err(err)) => {
                    warn!(%peer, error = %err, "failed to read callback request");
                    continue;
                }
                Err(_) => {
                    debug!(%peer, "dropping idle callback connection");
                    continue;
                }
            };
            let request = String::from_utf8_lossy(&buffer[..read]);

            let (params, response) = match request_target(&request) {
                Some((path, query)) if path == self.path => match params_from_query(&query) {
                    Some(params) => (Some(params), success_response()),
                    None => (None, error_response(400, "Missing oauth_verifier")),
                },
                _ => (None, error_response(404, "Not found")),
            };

            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;

            if let Some(params) = params {
                info!("authorization callback received");
                return Ok(params);
            }
        }
    }
}

/// Splits the request line target into path and query.
fn request_target(request: &str) -> Option<(String, String)> {
    let request_line = request.lines().next()?;
    let mut parts = request_line.split_whitespace();
    let _method = parts.next()?;
    let target = parts.next()?;

    let url = url::Url::parse(&format!("http://localhost{target}")).ok()?;
    Some((url.path().to_string(), url.query().unwrap_or("").to_string()))
}

fn success_response() -> String {
    let body = "<!doctype html><html><head><meta charset=\"utf-8\" /><title>Authorization complete</title></head><body><p>Authorization complete. Return to your terminal to continue.</p></body></html>";
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

fn error_response(status: u16, body: &str) -> String {
    let reason = if status == 404 { "Not Found" } else { "Bad Request" };
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    )
}

/// Exchanges an authorized request token + verifier for an access pair.
///
/// `consumer` carries the consumer key/secret; its token fields are ignored.
/// `token_secret` is the secret paired with `request_token` (empty if the
/// store did not issue one).
pub async fn exchange_verifier(
    token_url: &str,
    consumer: &OAuthCredentials,
    request_token: &str,
    token_secret: &str,
    verifier: &str,
) -> Result<CachedTokens> {
    let signer = OAuthCredentials {
        consumer_key: consumer.consumer_key.clone(),
        consumer_secret: consumer.consumer_secret.clone(),
        access_token: request_token.to_string(),
        access_token_secret: token_secret.to_string(),
    };
    let header = signing::signed_header(&signer, &[("oauth_verifier", verifier)]);

    let client = reqwest::Client::new();
    let response = client
        .post(token_url)
        .header(reqwest::header::AUTHORIZATION, header)
        .header(reqwest::header::USER_AGENT, crate::api::USER_AGENT)
        .send()
        .await
        .context("Failed to send token exchange request")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        bail!("Token exchange failed (HTTP {status}): {body}");
    }

    let body = response
        .text()
        .await
        .context("Failed to read token response")?;
    parse_token_response(&body)
}

/// Parses a form-encoded (or JSON) `oauth_token`/`oauth_token_secret` body.
pub fn parse_token_response(body: &str) -> Result<CachedTokens> {
    #[derive(Deserialize)]
    struct TokenResponse {
        oauth_token: String,
        oauth_token_secret: String,
    }

    let trimmed = body.trim();
    let parsed: Option<TokenResponse> = if trimmed.starts_with('{') {
        serde_json::from_str(trimmed).ok()
    } else {
        let pairs: BTreeMap<String, String> = url::form_urlencoded::parse(trimmed.as_bytes())
            .into_owned()
            .collect();
        match (pairs.get("oauth_token"), pairs.get("oauth_token_secret")) {
            (Some(token), Some(secret)) => Some(TokenResponse {
                oauth_token: token.clone(),
                oauth_token_secret: secret.clone(),
            }),
            _ => None,
        }
    };

    match parsed {
        Some(tokens)
            if !tokens.oauth_token.is_empty() && !tokens.oauth_token_secret.is_empty() =>
        {
            Ok(CachedTokens::new(tokens.oauth_token, tokens.oauth_token_secret))
        }
        _ => bail!("Token response did not contain oauth_token and oauth_token_secret"),
    }
}
