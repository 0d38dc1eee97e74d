//! Tracing initialization.
//!
//! Logs go to a daily-rolled file under `$STOREFRONT_HOME/logs` so they never
//! interleave with command output. The filter comes from `STOREFRONT_LOG`
//! (EnvFilter syntax), else the config's `log_level`.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "STOREFRONT_LOG";

const LOG_FILE_PREFIX: &str = "storefront.log";

/// Builds the filter: `STOREFRONT_LOG` when set and valid, else `fallback`.
pub fn build_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Installs the global subscriber writing to `logs_dir`.
///
/// The returned guard flushes buffered lines on drop and must be held for
/// the life of the process. Calling this twice is harmless; the second
/// subscriber is not installed.
pub fn init(logs_dir: &Path, level: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level))
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .try_init();

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_init_creates_log_dir() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");
        let guard = init(&logs, "debug").unwrap();
        assert!(logs.is_dir());
        drop(guard);
    }

    #[test]
    fn test_invalid_fallback_degrades_to_warn() {
        let filter = build_filter("=[bad");
        assert!(!filter.to_string().is_empty());
    }
}
