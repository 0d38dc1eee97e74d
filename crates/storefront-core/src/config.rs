//! Configuration loading and editing.
//!
//! The config file lives at `$STOREFRONT_HOME/config.toml`. Missing keys fall
//! back to defaults; a missing file is equivalent to an empty one. Edits go
//! through `toml_edit` so user comments survive.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use toml_edit::{DocumentMut, Item};

pub const BASE_URL_ENV: &str = "STOREFRONT_BASE_URL";
pub const CONSUMER_KEY_ENV: &str = "STOREFRONT_CONSUMER_KEY";
pub const CONSUMER_SECRET_ENV: &str = "STOREFRONT_CONSUMER_SECRET";
pub const ACCESS_TOKEN_ENV: &str = "STOREFRONT_ACCESS_TOKEN";
pub const ACCESS_TOKEN_SECRET_ENV: &str = "STOREFRONT_ACCESS_TOKEN_SECRET";

/// Returns the default config template with comments.
///
/// Embedded from `default_config.toml` at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Parses the commented template and lays `overrides` on top of it.
///
/// Top-level keys replace the template's; `[api]`/`[oauth]` are merged per
/// field so a partial section keeps the template's remaining keys and
/// comments. Unknown keys are carried over as-is.
fn templated_document(overrides: Option<&str>) -> Result<DocumentMut> {
    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;
    let Some(overrides) = overrides else {
        return Ok(doc);
    };
    let overrides: DocumentMut = overrides
        .parse()
        .context("Failed to parse user config")?;

    for (key, item) in overrides.iter() {
        if let (Some(section), Some(target)) = (
            item.as_table(),
            doc.get_mut(key).and_then(Item::as_table_mut),
        ) {
            for (field, value) in section.iter() {
                target[field] = value.clone();
            }
            continue;
        }
        doc[key] = item.clone();
    }
    Ok(doc)
}

/// How a written file may be read by others.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FileAccess {
    Shared,
    /// Owner read/write only (0600 on unix).
    Private,
}

/// Writes `content` to a temp file next to `path`, then renames it into
/// place. Parent directories are created as needed.
pub(crate) fn write_atomic(path: &Path, content: &str, access: FileAccess) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create directory {}", parent.display()))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = match access {
            FileAccess::Shared => 0o644,
            FileAccess::Private => 0o600,
        };
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(mode))
            .with_context(|| format!("Failed to set permissions for {}", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = access;

    temp.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    temp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Reads a non-empty, trimmed environment variable.
pub fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

pub mod paths {
    //! Path resolution for storefront configuration and data.
    //!
    //! `STOREFRONT_HOME` resolution order:
    //! 1. `STOREFRONT_HOME` environment variable (if set)
    //! 2. `~/.config/storefront` (default)

    use std::path::PathBuf;

    pub const HOME_ENV: &str = "STOREFRONT_HOME";

    /// Returns the storefront home directory.
    pub fn storefront_home() -> PathBuf {
        if let Ok(home) = std::env::var(HOME_ENV) {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("storefront")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        storefront_home().join("config.toml")
    }

    /// Returns the directory log files are written to.
    pub fn logs_dir() -> PathBuf {
        storefront_home().join("logs")
    }
}

/// `[api]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Store root; REST endpoints live under `{base_url}/api/rest`.
    pub base_url: Option<String>,
    /// Request timeout in seconds, 0 disables.
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
        }
    }
}

/// `[oauth]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub consumer_key: Option<String>,
    pub consumer_secret: Option<String>,
    pub access_token: Option<String>,
    pub access_token_secret: Option<String>,
    pub callback_url: Option<String>,
    pub authorize_path: String,
    pub token_path: String,
    pub auth_type: String,
    pub login_timeout_secs: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            consumer_key: None,
            consumer_secret: None,
            access_token: None,
            access_token_secret: None,
            callback_url: None,
            authorize_path: "/oauth/authorize/identifier".to_string(),
            token_path: "/oauth/token".to_string(),
            auth_type: "1".to_string(),
            login_timeout_secs: 120,
        }
    }
}

impl OAuthConfig {
    /// Consumer key with precedence: env > config.
    pub fn effective_consumer_key(&self) -> Option<String> {
        env_value(CONSUMER_KEY_ENV)
            .or_else(|| non_empty(self.consumer_key.as_deref()).map(str::to_string))
    }

    /// Consumer secret with precedence: env > config.
    pub fn effective_consumer_secret(&self) -> Option<String> {
        env_value(CONSUMER_SECRET_ENV)
            .or_else(|| non_empty(self.consumer_secret.as_deref()).map(str::to_string))
    }

    pub fn effective_callback_url(&self) -> Option<&str> {
        non_empty(self.callback_url.as_deref())
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login_timeout_secs.max(1))
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log filter used when `STOREFRONT_LOG` is unset.
    pub log_level: Option<String>,
    /// Products requested per page.
    pub page_size: u32,
    pub api: ApiConfig,
    pub oauth: OAuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: None,
            page_size: Self::DEFAULT_PAGE_SIZE,
            api: ApiConfig::default(),
            oauth: OAuthConfig::default(),
        }
    }
}

impl Config {
    const DEFAULT_PAGE_SIZE: u32 = 20;
    const DEFAULT_LOG_LEVEL: &str = "warn";

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Base URL with precedence: env > config. There is no built-in default.
    pub fn effective_base_url(&self) -> Result<String> {
        let url = env_value(BASE_URL_ENV)
            .or_else(|| non_empty(self.api.base_url.as_deref()).map(str::to_string))
            .with_context(|| {
                format!("No store base URL configured. Set {BASE_URL_ENV} or base_url in [api].")
            })?;
        validate_url(&url)?;
        Ok(url)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.api.timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.api.timeout_secs))
        }
    }

    pub fn effective_page_size(&self) -> u32 {
        if self.page_size == 0 {
            Self::DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }

    pub fn effective_log_level(&self) -> &str {
        non_empty(self.log_level.as_deref()).unwrap_or(Self::DEFAULT_LOG_LEVEL)
    }

    /// Saves only the `page_size` field to the config file.
    pub fn save_page_size(page_size: u32) -> Result<()> {
        Self::save_page_size_to(&paths::config_path(), page_size)
    }

    /// Saves only the `page_size` field to a specific config file path.
    ///
    /// The existing file's values are kept and laid over the current
    /// template, so newly added keys show up with their comments.
    pub fn save_page_size_to(path: &Path, page_size: u32) -> Result<()> {
        let existing = if path.exists() {
            Some(
                fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config from {}", path.display()))?,
            )
        } else {
            None
        };

        let mut doc = templated_document(existing.as_deref())
            .with_context(|| format!("Failed to update config at {}", path.display()))?;
        doc["page_size"] = toml_edit::value(i64::from(page_size));

        write_atomic(path, &doc.to_string(), FileAccess::Shared)
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        write_atomic(path, default_config_template(), FileAccess::Shared)
    }

    /// Generates a config TOML from the Rust defaults, laid over the
    /// commented template.
    pub fn generate() -> Result<String> {
        let defaults =
            toml::to_string(&Config::default()).context("Failed to serialize default config")?;
        Ok(templated_document(Some(&defaults))?.to_string())
    }
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid store base URL: {url}"))?;
    Ok(())
}
