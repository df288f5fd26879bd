// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide logging setup (SPEC_FULL §4.8). Installed once from the
//! binary entry point; library crates only emit `tracing` events, never
//! install a subscriber themselves.

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber with an `EnvFilter` defaulting to
/// `info` when `RUST_LOG` is unset.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
