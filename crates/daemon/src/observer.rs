// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observer fan-out (spec §2 item 5, §4.1): every committed Instance state
//! change is pushed to registered observers. Observers must not block —
//! they run on the Instance's own task.

use std::collections::HashMap;

use build_worker_core::StatusReport;
use parking_lot::RwLock;

pub trait Observer: Send + Sync {
    fn on_status(&self, report: &StatusReport);
}

/// Logs every status report at `info`. The default observer registered by
/// the binary even when no supervisor aggregation is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_status(&self, report: &StatusReport) {
        tracing::info!(
            instance = %report.name,
            state = %report.state,
            last_error = report.last_error.as_deref().unwrap_or(""),
            "instance status changed"
        );
    }
}

/// Aggregates the latest [`StatusReport`] per instance name, keyed by the
/// report's `name` field (spec §2 item 5, §9 "Supervisor / multi-instance
/// hosting"). Registered on every Instance a supervisor owns.
#[derive(Default)]
pub struct AggregatingObserver {
    latest: RwLock<HashMap<String, StatusReport>>,
}

impl AggregatingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A snapshot of every instance's most recently observed status,
    /// sorted by instance name for stable output.
    pub fn snapshot(&self) -> Vec<StatusReport> {
        let mut reports: Vec<_> = self.latest.read().values().cloned().collect();
        reports.sort_by(|a, b| a.name.cmp(&b.name));
        reports
    }
}

impl Observer for AggregatingObserver {
    fn on_status(&self, report: &StatusReport) {
        self.latest.write().insert(report.name.clone(), report.clone());
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::RecordingObserver;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// Collects every report for assertion in tests.
    #[derive(Default)]
    pub struct RecordingObserver {
        reports: Mutex<Vec<StatusReport>>,
    }

    impl RecordingObserver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn reports(&self) -> Vec<StatusReport> {
            self.reports.lock().clone()
        }
    }

    impl Observer for RecordingObserver {
        fn on_status(&self, report: &StatusReport) {
            self.reports.lock().push(report.clone());
        }
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
