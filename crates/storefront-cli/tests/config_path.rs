use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("storefront")
        .env("STOREFRONT_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    cargo_bin_cmd!("storefront")
        .env("STOREFRONT_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    assert!(config_path.exists());

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("page_size = 20"));
    assert!(contents.contains("# base_url ="));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(&config_path, "# existing config").unwrap();

    cargo_bin_cmd!("storefront")
        .env("STOREFRONT_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_page_size_is_saved() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("storefront")
        .env("STOREFRONT_HOME", dir.path())
        .args(["config", "page-size", "50"])
        .assert()
        .success()
        .stdout(predicate::str::contains("page_size = 50"));

    let contents = fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(contents.contains("page_size = 50"));
}

#[test]
fn test_missing_base_url_is_reported() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("storefront")
        .env("STOREFRONT_HOME", dir.path())
        .env_remove("STOREFRONT_BASE_URL")
        .arg("categories")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No store base URL configured"));
}
