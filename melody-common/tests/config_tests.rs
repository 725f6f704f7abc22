//! Configuration resolution tests
//!
//! Tests that touch process environment are serialized.

use melody_common::config::{load_toml_config, resolve_root_folder, TomlConfig};
use serial_test::serial;
use std::path::{Path, PathBuf};

const TEST_ENV: &str = "MELODY_TEST_ROOT_FOLDER";

#[test]
#[serial]
fn test_cli_argument_wins() {
    std::env::set_var(TEST_ENV, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let root = resolve_root_folder(Some(Path::new("/from/cli")), TEST_ENV, &toml);

    assert_eq!(root, PathBuf::from("/from/cli"));
    std::env::remove_var(TEST_ENV);
}

#[test]
#[serial]
fn test_env_beats_toml() {
    std::env::set_var(TEST_ENV, "/from/env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    let root = resolve_root_folder(None, TEST_ENV, &toml);

    assert_eq!(root, PathBuf::from("/from/env"));
    std::env::remove_var(TEST_ENV);
}

#[test]
#[serial]
fn test_toml_then_default() {
    std::env::remove_var(TEST_ENV);
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..Default::default()
    };

    assert_eq!(resolve_root_folder(None, TEST_ENV, &toml), PathBuf::from("/from/toml"));

    let fallback = resolve_root_folder(None, TEST_ENV, &TomlConfig::default());
    assert!(fallback.ends_with("melody") || fallback.ends_with("melody_data"));
}

#[test]
fn test_load_explicit_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        root_folder = "/srv/melody"
        proxy_timeout_secs = 30
        proxy_allowed_hosts = ["samplelib.com", "*.cdn.example.com"]
        "#,
    )
    .unwrap();

    let config = load_toml_config(Some(&path)).unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/melody")));
    assert_eq!(config.proxy_timeout_secs, Some(30));
    assert_eq!(config.proxy_allowed_hosts.unwrap().len(), 2);
}

#[test]
fn test_missing_explicit_config_is_error() {
    let result = load_toml_config(Some(Path::new("/definitely/not/here/config.toml")));
    assert!(result.is_err());
}
