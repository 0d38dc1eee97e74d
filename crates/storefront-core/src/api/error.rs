//! Typed failures of the catalog API client.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The request never completed (connect failure, timeout, TLS).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// The request was rejected before it was sent.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The response body was not the JSON shape we expect.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl CatalogError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// HTTP status for `Api` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for 401/403 responses.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }
}

/// Maps a transport-level reqwest failure onto [`CatalogError`].
pub(crate) fn classify_reqwest_error(e: &reqwest::Error) -> CatalogError {
    if e.is_timeout() {
        CatalogError::Network(format!("Request timed out: {e}"))
    } else if e.is_connect() {
        CatalogError::Network(format!("Connection failed: {e}"))
    } else if e.is_decode() {
        CatalogError::Decode(format!("Failed to read response body: {e}"))
    } else if e.is_builder() {
        CatalogError::Validation(format!("Invalid request: {e}"))
    } else {
        CatalogError::Network(format!("Request error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unauthorized_statuses() {
        assert!(CatalogError::api(401, "").is_unauthorized());
        assert!(CatalogError::api(403, "denied").is_unauthorized());
        assert!(!CatalogError::api(500, "").is_unauthorized());
        assert!(!CatalogError::validation("x").is_unauthorized());
    }

    #[test]
    fn test_api_error_message_carries_status_and_body() {
        let err = CatalogError::api(404, "Resource not found");
        assert_eq!(err.to_string(), "API error (HTTP 404): Resource not found");
        assert_eq!(err.status(), Some(404));
    }
}
