//! OAuth 1.0a `Authorization` header construction.
//!
//! Requests are signed with the `PLAINTEXT` method: the signature is
//! `enc(consumer_secret)&enc(token_secret)`. Every request gets a fresh
//! timestamp and nonce.

use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

/// Credentials used to sign catalog requests.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl OAuthCredentials {
    /// True when all four values are present.
    pub fn is_complete(&self) -> bool {
        [
            &self.consumer_key,
            &self.consumer_secret,
            &self.access_token,
            &self.access_token_secret,
        ]
        .iter()
        .all(|value| !value.trim().is_empty())
    }

    /// Names of the missing values, for error messages.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("consumer_key", &self.consumer_key),
            ("consumer_secret", &self.consumer_secret),
            ("access_token", &self.access_token),
            ("access_token_secret", &self.access_token_secret),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"***")
            .field("access_token", &mask_token(&self.access_token))
            .field("access_token_secret", &"***")
            .finish()
    }
}

/// Builds the `Authorization` header value with a fresh timestamp and nonce.
pub fn authorization_header(creds: &OAuthCredentials) -> String {
    signed_header(creds, &[])
}

/// Like [`authorization_header`], with extra `oauth_*` parameters appended
/// (e.g. `oauth_verifier` during the token exchange).
pub fn signed_header(creds: &OAuthCredentials, extra: &[(&str, &str)]) -> String {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    authorization_header_with(creds, unix_timestamp(), &nonce, extra)
}

/// Builds the `Authorization` header value for a fixed timestamp and nonce.
pub fn authorization_header_with(
    creds: &OAuthCredentials,
    timestamp: u64,
    nonce: &str,
    extra: &[(&str, &str)],
) -> String {
    let signature = plaintext_signature(&creds.consumer_secret, &creds.access_token_secret);
    let timestamp = timestamp.to_string();
    let mut params = vec![("oauth_consumer_key", creds.consumer_key.as_str())];
    if !creds.access_token.is_empty() {
        params.push(("oauth_token", creds.access_token.as_str()));
    }
    params.extend([
        ("oauth_signature_method", "PLAINTEXT"),
        ("oauth_signature", signature.as_str()),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_version", "1.0"),
    ]);
    params.extend_from_slice(extra);

    let mut header = String::from("OAuth ");
    for (idx, (key, value)) in params.iter().enumerate() {
        if idx > 0 {
            header.push_str(", ");
        }
        let _ = write!(header, "{key}=\"{}\"", percent_encode(value));
    }
    header
}

/// `PLAINTEXT` signature: `enc(consumer_secret)&enc(token_secret)`.
pub fn plaintext_signature(consumer_secret: &str, token_secret: &str) -> String {
    format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    )
}

/// RFC 3986 percent-encoding as required by OAuth 1.0a (only unreserved
/// characters pass through, spaces become `%20`).
pub fn percent_encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Returns a masked version of a token for display (first 6 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 10 || !token.is_char_boundary(6) {
        return "***".to_string();
    }
    format!("{}...", &token[..6])
}

fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> OAuthCredentials {
        OAuthCredentials {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs&1".to_string(),
            access_token: "at".to_string(),
            access_token_secret: "ts 2".to_string(),
        }
    }

    #[test]
    fn test_percent_encode_unreserved_only() {
        assert_eq!(percent_encode("aZ09-._~"), "aZ09-._~");
        assert_eq!(percent_encode("a b&c/ü"), "a%20b%26c%2F%C3%BC");
    }

    #[test]
    fn test_plaintext_signature_double_encodes_in_header() {
        assert_eq!(plaintext_signature("cs&1", "ts 2"), "cs%261&ts%202");

        let header = authorization_header_with(&creds(), 1_700_000_000, "abc", &[]);
        assert_eq!(
            header,
            "OAuth oauth_consumer_key=\"ck\", oauth_token=\"at\", \
             oauth_signature_method=\"PLAINTEXT\", \
             oauth_signature=\"cs%25261%26ts%25202\", \
             oauth_timestamp=\"1700000000\", oauth_nonce=\"abc\", oauth_version=\"1.0\""
        );
    }

    #[test]
    fn test_extra_params_and_missing_token() {
        let mut creds = creds();
        creds.access_token = String::new();
        let header = authorization_header_with(&creds, 1, "n", &[("oauth_verifier", "v 1")]);
        assert!(!header.contains("oauth_token="));
        assert!(header.ends_with("oauth_verifier=\"v%201\""));
    }

    #[test]
    fn test_fresh_nonce_per_header() {
        let a = authorization_header(&creds());
        let b = authorization_header(&creds());
        assert_ne!(a, b);
    }

    #[test]
    fn test_completeness_and_missing_names() {
        assert!(creds().is_complete());
        let partial = OAuthCredentials {
            consumer_key: "ck".to_string(),
            access_token: "  ".to_string(),
            ..Default::default()
        };
        assert!(!partial.is_complete());
        assert_eq!(
            partial.missing(),
            vec!["consumer_secret", "access_token", "access_token_secret"]
        );
    }

    #[test]
    fn test_debug_masks_secrets() {
        let mut creds = creds();
        creds.access_token = "abcdefghijklmnop".to_string();
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("cs&1"));
        assert!(!rendered.contains("abcdefghijklmnop"));
        assert!(rendered.contains("abcdef..."));
    }

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("short"), "***");
        assert_eq!(mask_token("0123456789abcdef"), "012345...");
    }
}
