// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! build-worker-daemon: the Instance state machine, supervisor, and process
//! wiring (config, logging, observers) for the build worker binary.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod instance;
pub mod logging;
pub mod observer;
pub mod supervisor;

pub use config::{ConfigError, WorkerConfig};
pub use instance::{Instance, InstanceOptions};
pub use observer::{AggregatingObserver, Observer, TracingObserver};
pub use supervisor::Supervisor;

#[cfg(any(test, feature = "test-support"))]
pub use observer::RecordingObserver;
