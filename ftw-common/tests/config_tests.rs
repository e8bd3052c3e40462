//! Configuration loading and root folder resolution
//!
//! Tests that touch FTW_ROOT_FOLDER are #[serial] so they never observe each
//! other's environment.

use ftw_common::config::{
    default_root_folder, RootFolderInitializer, RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV,
};
use ftw_common::Error;
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(ROOT_FOLDER_ENV);

    let resolved = RootFolderResolver::new().resolve();
    assert_eq!(resolved, default_root_folder());
}

#[test]
#[serial]
fn test_cli_argument_wins() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };

    let resolved = RootFolderResolver::new()
        .with_cli_arg(Some(PathBuf::from("/tmp/from-cli")))
        .with_toml(&toml)
        .resolve();
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/tmp/from-cli"));
}

#[test]
#[serial]
fn test_environment_beats_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/from-env");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };

    let resolved = RootFolderResolver::new().with_toml(&toml).resolve();
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/tmp/from-env"));
}

#[test]
#[serial]
fn test_toml_used_when_environment_empty() {
    env::set_var(ROOT_FOLDER_ENV, "  ");
    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/from-toml")),
        ..Default::default()
    };

    let resolved = RootFolderResolver::new().with_toml(&toml).resolve();
    env::remove_var(ROOT_FOLDER_ENV);

    assert_eq!(resolved, PathBuf::from("/tmp/from-toml"));
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let result = TomlConfig::load(Some(&dir.path().join("absent.toml")));
    match result {
        Err(Error::Config(message)) => assert!(message.contains("absent.toml")),
        other => panic!("expected config error, got {:?}", other),
    }
}

#[test]
fn test_config_file_is_read() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/ftw"
port = 9100
classifier_url = "http://127.0.0.1:7000/classify"
drop_scheduler_interval_secs = 60

[logging]
level = "debug"
"#,
    )
    .unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/ftw")));
    assert_eq!(config.port, 9100);
    assert_eq!(config.bind_address, "127.0.0.1");
    assert_eq!(config.drop_scheduler_interval_secs, 60);
    assert_eq!(config.auth_window_ms, 30_000);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_unparseable_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    assert!(matches!(TomlConfig::from_file(&path), Err(Error::Config(_))));
    assert!(matches!(TomlConfig::load(Some(&path)), Err(Error::Config(_))));
}

#[test]
fn test_initializer_creates_layout() {
    let dir = TempDir::new().unwrap();
    let init = RootFolderInitializer::new(dir.path().join("root"));

    assert!(!init.database_exists());
    init.ensure_directory_exists().unwrap();
    init.ensure_directory_exists().unwrap();

    assert!(dir.path().join("root").join("artifacts").is_dir());
    assert_eq!(init.database_path(), dir.path().join("root").join("ftw.db"));
    assert_eq!(
        init.governance_ledger_path(),
        dir.path().join("root").join("artifacts").join("governance-ledger.json")
    );
}
