// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Crash reporting sink (SPEC_FULL §2 item 9, §4.8): a side channel for
//! "this should never happen" failures that still warrant human attention
//! but must never block or fail the worker's own control flow.

use async_trait::async_trait;

#[async_trait]
pub trait CrashReporter: Send + Sync {
    /// Record an out-of-band failure. Implementations must not propagate
    /// errors back into the caller's control flow; a reporter that cannot
    /// deliver should log and swallow, not panic.
    async fn capture(&self, context: &str, error: &str);
}

/// Default sink: logs at `error` level via `tracing`. Always available, no
/// external dependency.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCrashReporter;

#[async_trait]
impl CrashReporter for TracingCrashReporter {
    async fn capture(&self, context: &str, error: &str) {
        tracing::error!(context, error, "unclassified failure captured");
    }
}

/// Discards everything. Used in tests that don't care about crash capture.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCrashReporter;

#[async_trait]
impl CrashReporter for NoopCrashReporter {
    async fn capture(&self, _context: &str, _error: &str) {}
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::RecordingCrashReporter;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// Collects every `capture` call for assertion in tests.
    #[derive(Default)]
    pub struct RecordingCrashReporter {
        captured: Mutex<Vec<(String, String)>>,
    }

    impl RecordingCrashReporter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn captured(&self) -> Vec<(String, String)> {
            self.captured.lock().clone()
        }
    }

    #[async_trait]
    impl CrashReporter for RecordingCrashReporter {
        async fn capture(&self, context: &str, error: &str) {
            self.captured.lock().push((context.to_string(), error.to_string()));
        }
    }
}

#[cfg(test)]
#[path = "crash_tests.rs"]
mod tests;
