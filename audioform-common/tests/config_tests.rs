//! Configuration resolution and graceful degradation
//!
//! Tests that manipulate AUDIOFORM_CONFIG are marked #[serial] so they never
//! race each other on the process environment.

use audioform_common::config::{load_config, resolve_config_path, StoreKind, CONFIG_ENV_VAR};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
#[serial]
fn test_cli_argument_beats_environment() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/audioform-env.toml");
    let cli = PathBuf::from("/tmp/audioform-cli.toml");

    let resolved = resolve_config_path(Some(&cli));
    assert_eq!(resolved, Some(cli));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_environment_variable_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/audioform-env.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/audioform-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_explicit_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let missing = PathBuf::from("/nonexistent/audioform/config.toml");

    let config = load_config(Some(&missing)).expect("missing file is not fatal");
    assert_eq!(config.port, 5730);
    assert_eq!(config.store.kind, StoreKind::Sqlite);
}

#[test]
#[serial]
fn test_load_from_file() {
    env::remove_var(CONFIG_ENV_VAR);
    let file = write_config(
        r#"
        port = 8080
        submit_timeout_ms = 2500
        dashboard_token = "secret"

        [store]
        kind = "memory"

        [logging]
        level = "debug"

        [[tenants]]
        path = "/acme"
        company = "Acme Staffing"
        "#,
    );

    let config = load_config(Some(file.path())).expect("config loads");
    assert_eq!(config.port, 8080);
    assert_eq!(config.submit_timeout().as_millis(), 2500);
    assert_eq!(config.dashboard_token.as_deref(), Some("secret"));
    assert_eq!(config.store.kind, StoreKind::Memory);
    assert_eq!(config.logging.level, "debug");

    let tenants = config.tenant_table();
    assert_eq!(tenants.get("/acme").unwrap().company, "Acme Staffing");
    // Default route is always present
    assert!(tenants.get("/").is_some());
}

#[test]
#[serial]
fn test_load_from_env_file() {
    let file = write_config("port = 9191\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    let config = load_config(None).expect("config loads");
    assert_eq!(config.port, 9191);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_malformed_file_is_an_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let file = write_config("port = \"not a number\"\n");

    assert!(load_config(Some(file.path())).is_err());
}

#[test]
#[serial]
fn test_no_tenants_uses_builtin_table() {
    env::remove_var(CONFIG_ENV_VAR);
    let file = write_config("port = 5730\n");

    let config = load_config(Some(file.path())).expect("config loads");
    let tenants = config.tenant_table();
    assert_eq!(tenants.get("/af_x7k9v").unwrap().company, "Emergency Ambulance");
}
