use std::fs;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use tempfile::{TempDir, tempdir};
use wiremock::matchers::{header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn storefront(home: &TempDir, server: &MockServer) -> Command {
    let mut cmd = cargo_bin_cmd!("storefront");
    cmd.env("STOREFRONT_HOME", home.path())
        .env("STOREFRONT_BASE_URL", server.uri())
        .env("STOREFRONT_CONSUMER_KEY", "ck")
        .env("STOREFRONT_CONSUMER_SECRET", "cs")
        .env_remove("STOREFRONT_ACCESS_TOKEN")
        .env_remove("STOREFRONT_ACCESS_TOKEN_SECRET")
        .env("STOREFRONT_NO_BROWSER", "1");
    cmd
}

fn write_cached_tokens(home: &TempDir, server: &MockServer) {
    let mut cache = serde_json::Map::new();
    cache.insert(
        server.uri(),
        json!({
            "access_token": "cached-token-123",
            "access_token_secret": "cached-secret",
            "obtained_at": 1
        }),
    );
    let contents = serde_json::Value::Object(cache).to_string();
    fs::write(home.path().join("oauth.json"), contents).unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_without_tokens_lists_missing_values() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    storefront(&home, &server)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not authenticated"))
        .stdout(predicate::str::contains("access_token, access_token_secret"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_uses_cached_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/rest/categories"))
        .and(header_regex("authorization", "oauth_token=\"cached-token-123\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    write_cached_tokens(&home, &server);

    storefront(&home, &server)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Authenticated"))
        .stdout(predicate::str::contains("cached-token-123").not());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_rejected_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/rest/categories"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let home = tempdir().unwrap();
    write_cached_tokens(&home, &server);

    storefront(&home, &server)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("rejected the current credentials"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_logout_removes_cached_tokens() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();
    write_cached_tokens(&home, &server);

    storefront(&home, &server)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Logged out"));

    let cache = fs::read_to_string(home.path().join("oauth.json")).unwrap();
    assert!(!cache.contains("cached-token-123"));

    storefront(&home, &server)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("no cached tokens found"));
}

/// A non-loopback callback falls back to pasting the redirect URL.
#[tokio::test(flavor = "multi_thread")]
async fn test_login_with_pasted_redirect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(header_regex("authorization", "oauth_token=\"request-token\""))
        .and(header_regex("authorization", "oauth_verifier=\"v123\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("oauth_token=new-token-abcdef&oauth_token_secret=new-secret"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rest/categories"))
        .and(header_regex("authorization", "oauth_token=\"new-token-abcdef\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let home = tempdir().unwrap();
    fs::write(
        home.path().join("config.toml"),
        "[oauth]\ncallback_url = \"https://shop.example/callback\"\n",
    )
    .unwrap();

    storefront(&home, &server)
        .arg("login")
        .write_stdin(
            "https://shop.example/callback?oauth_token=request-token&oauth_verifier=v123\n",
        )
        .assert()
        .success()
        .stdout(predicate::str::contains("Authorization URL:"))
        .stdout(predicate::str::contains("/oauth/authorize/identifier?"))
        .stdout(predicate::str::contains("✓ Logged in"));

    let cache = fs::read_to_string(home.path().join("oauth.json")).unwrap();
    assert!(cache.contains("new-token-abcdef"));
    assert!(cache.contains(&server.uri()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_requires_consumer_credentials() {
    let server = MockServer::start().await;
    let home = tempdir().unwrap();

    storefront(&home, &server)
        .env_remove("STOREFRONT_CONSUMER_KEY")
        .arg("login")
        .assert()
        .failure()
        .stderr(predicate::str::contains("consumer key and secret are required"));
}
