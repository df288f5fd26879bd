// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Metrics sink (SPEC_FULL §4.9): a minimal counter/gauge surface, enough to
//! track the fixed `worker.job.requeue` counter without pulling in a metrics
//! exporter the worker doesn't otherwise need.

pub trait MetricsSink: Send + Sync {
    fn incr_counter(&self, name: &str);
    fn observe_gauge(&self, name: &str, value: f64);
}

/// Default sink: every observation becomes a `tracing` event at `info`
/// level with structured fields, picked up by whatever subscriber the
/// binary installs (SPEC_FULL §4.8/§4.9).
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn incr_counter(&self, name: &str) {
        tracing::info!(metric = name, kind = "counter", "metric incremented");
    }

    fn observe_gauge(&self, name: &str, value: f64) {
        tracing::info!(metric = name, kind = "gauge", value, "metric observed");
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::InMemoryMetricsSink;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Records counters and gauges in memory for test assertions.
    #[derive(Default)]
    pub struct InMemoryMetricsSink {
        counters: Mutex<HashMap<String, u64>>,
        gauges: Mutex<HashMap<String, f64>>,
    }

    impl InMemoryMetricsSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn count(&self, name: &str) -> u64 {
            *self.counters.lock().get(name).unwrap_or(&0)
        }

        pub fn gauge(&self, name: &str) -> Option<f64> {
            self.gauges.lock().get(name).copied()
        }
    }

    impl MetricsSink for InMemoryMetricsSink {
        fn incr_counter(&self, name: &str) {
            *self.counters.lock().entry(name.to_string()).or_insert(0) += 1;
        }

        fn observe_gauge(&self, name: &str, value: f64) {
            self.gauges.lock().insert(name.to_string(), value);
        }
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
