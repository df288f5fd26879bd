// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_env() {
    for var in [
        "BW_CONFIG",
        "XDG_CONFIG_HOME",
        "BW_HOST",
        "BW_BUILDS_QUEUE",
        "BW_LOGS_QUEUE",
        "BW_HARD_LIMIT_SECS",
        "BW_LOG_SILENCE_SECS",
        "BW_COOLDOWN_SECS",
        "BW_SHUTDOWN_GRACE_SECS",
    ] {
        std::env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_apply_when_no_file_and_no_env() {
    clear_env();
    let config = WorkerConfig::load().unwrap();
    assert_eq!(config.builds_queue, "builds");
    assert_eq!(config.cooldown_secs, 10);
}

#[test]
#[serial]
fn missing_config_file_is_not_an_error() {
    clear_env();
    std::env::set_var("BW_CONFIG", "/nonexistent/path/config.toml");
    let config = WorkerConfig::load();
    assert!(config.is_ok());
    clear_env();
}

#[test]
#[serial]
fn file_values_are_overlaid_on_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "builds_queue = \"custom-builds\"\ncooldown_secs = 30\n").unwrap();
    std::env::set_var("BW_CONFIG", &path);

    let config = WorkerConfig::load().unwrap();
    assert_eq!(config.builds_queue, "custom-builds");
    assert_eq!(config.cooldown_secs, 30);
    assert_eq!(config.logs_queue, "logs");
    clear_env();
}

#[test]
#[serial]
fn malformed_config_file_is_a_startup_error() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();
    std::env::set_var("BW_CONFIG", &path);

    let result = WorkerConfig::load();
    assert!(matches!(result, Err(ConfigError::Parse { .. })));
    clear_env();
}

#[test]
#[serial]
fn env_vars_take_precedence_over_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "builds_queue = \"from-file\"\n").unwrap();
    std::env::set_var("BW_CONFIG", &path);
    std::env::set_var("BW_BUILDS_QUEUE", "from-env");

    let config = WorkerConfig::load().unwrap();
    assert_eq!(config.builds_queue, "from-env");
    clear_env();
}
