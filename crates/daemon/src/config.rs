// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered worker configuration (SPEC_FULL §4.7): compiled-in defaults,
//! overridden by an optional TOML file, overridden by environment
//! variables. CLI flags are layered on top by the binary after `load()`.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("malformed config file {path}: {source}")]
    Parse { path: PathBuf, source: toml::de::Error },
}

/// Worker-wide settings, loaded once at process start and never mutated
/// (spec §3 `WorkerConfig`).
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub host: String,
    pub builds_queue: String,
    pub logs_queue: String,
    pub reporting_builds_queue: String,
    pub reporting_logs_queue: String,
    pub hard_limit_secs: u64,
    pub log_silence_secs: u64,
    pub cooldown_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            builds_queue: "builds".to_string(),
            logs_queue: "logs".to_string(),
            reporting_builds_queue: "reporting.jobs.builds".to_string(),
            reporting_logs_queue: "reporting.jobs.logs".to_string(),
            hard_limit_secs: 7200,
            log_silence_secs: 600,
            cooldown_secs: 10,
            shutdown_grace_secs: 2,
        }
    }
}

fn default_host() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string())
}

/// Mirrors the subset of [`WorkerConfig`] that may appear in the TOML file;
/// every field is optional so a partial file only overrides what it names.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    host: Option<String>,
    builds_queue: Option<String>,
    logs_queue: Option<String>,
    reporting_builds_queue: Option<String>,
    reporting_logs_queue: Option<String>,
    hard_limit_secs: Option<u64>,
    log_silence_secs: Option<u64>,
    cooldown_secs: Option<u64>,
    shutdown_grace_secs: Option<u64>,
}

impl WorkerConfig {
    /// Resolve config path, in decreasing precedence: `BW_CONFIG` >
    /// `XDG_CONFIG_HOME/build-worker/config.toml` > `~/.config/build-worker/config.toml`.
    /// Mirrors the teacher's `state_dir()` env-var resolution convention.
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("BW_CONFIG") {
            return Some(PathBuf::from(dir));
        }
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg).join("build-worker/config.toml"));
        }
        let home = std::env::var("HOME").ok()?;
        Some(PathBuf::from(home).join(".config/build-worker/config.toml"))
    }

    /// Load defaults, overlay an optional config file, then overlay
    /// environment variables. A missing config file is not an error; a
    /// present-but-malformed one is.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = Self::config_path() {
            if path.exists() {
                let contents = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path: path.clone(), source })?;
                let file: FileConfig =
                    toml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })?;
                config.apply_file(file);
            }
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(v) = file.host {
            self.host = v;
        }
        if let Some(v) = file.builds_queue {
            self.builds_queue = v;
        }
        if let Some(v) = file.logs_queue {
            self.logs_queue = v;
        }
        if let Some(v) = file.reporting_builds_queue {
            self.reporting_builds_queue = v;
        }
        if let Some(v) = file.reporting_logs_queue {
            self.reporting_logs_queue = v;
        }
        if let Some(v) = file.hard_limit_secs {
            self.hard_limit_secs = v;
        }
        if let Some(v) = file.log_silence_secs {
            self.log_silence_secs = v;
        }
        if let Some(v) = file.cooldown_secs {
            self.cooldown_secs = v;
        }
        if let Some(v) = file.shutdown_grace_secs {
            self.shutdown_grace_secs = v;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("BW_HOST") {
            self.host = v;
        }
        if let Ok(v) = std::env::var("BW_BUILDS_QUEUE") {
            self.builds_queue = v;
        }
        if let Ok(v) = std::env::var("BW_LOGS_QUEUE") {
            self.logs_queue = v;
        }
        if let Some(v) = parse_env_u64("BW_HARD_LIMIT_SECS") {
            self.hard_limit_secs = v;
        }
        if let Some(v) = parse_env_u64("BW_LOG_SILENCE_SECS") {
            self.log_silence_secs = v;
        }
        if let Some(v) = parse_env_u64("BW_COOLDOWN_SECS") {
            self.cooldown_secs = v;
        }
        if let Some(v) = parse_env_u64("BW_SHUTDOWN_GRACE_SECS") {
            self.shutdown_grace_secs = v;
        }
    }

    pub fn default_timeouts(&self) -> build_worker_core::Timeouts {
        build_worker_core::Timeouts {
            hard_limit_secs: self.hard_limit_secs,
            log_silence_secs: self.log_silence_secs,
        }
    }
}

fn parse_env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
