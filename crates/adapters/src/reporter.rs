// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reporter (spec §4.5): publishes job-level events and log chunks onto the
//! two reporting queues.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use build_worker_core::{FinishState, JobId};
use serde::Serialize;

use crate::bus::{Bus, BusError};

#[derive(Debug, Serialize)]
#[serde(tag = "event")]
enum BuildEvent {
    #[serde(rename = "job:received")]
    Received { job_id: i64 },
    #[serde(rename = "job:finished")]
    Finished { job_id: i64, state: FinishState },
    #[serde(rename = "job:restart")]
    Restart { job_id: i64 },
}

#[derive(Debug, Serialize)]
struct LogEvent {
    job_id: i64,
    seq: u64,
    chunk: String,
}

/// Publishes job events onto `builds_queue` and ordered log chunks onto
/// `logs_queue`. Constructed once per Instance at startup, never inside the
/// delivery callback — see spec §9 "eager reporter construction": building a
/// fresh Reporter per message would race the first delivery against a cold
/// channel open.
#[derive(Clone)]
pub struct Reporter {
    bus: Arc<dyn Bus>,
    builds_queue: String,
    logs_queue: String,
    /// Per-job log sequence counter. Reset by `reset()` from the `ensure`
    /// tail of `process` (spec §4.5) — ordering is only guaranteed within a
    /// job, not across jobs sharing the same Instance.
    seq: Arc<AtomicU64>,
}

impl Reporter {
    pub fn new(bus: Arc<dyn Bus>, builds_queue: impl Into<String>, logs_queue: impl Into<String>) -> Self {
        Self { bus, builds_queue: builds_queue.into(), logs_queue: logs_queue.into(), seq: Arc::new(AtomicU64::new(0)) }
    }

    pub async fn notify_job_received(&self, job_id: JobId) -> Result<(), BusError> {
        self.publish_build(&BuildEvent::Received { job_id: job_id.0 }).await
    }

    pub async fn send_log(&self, job_id: JobId, chunk: impl Into<String>) -> Result<(), BusError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let event = LogEvent { job_id: job_id.0, seq, chunk: chunk.into() };
        let payload = serde_json::to_vec(&event).map_err(|err| BusError::Encode(err.to_string()))?;
        self.bus.publish(&self.logs_queue, payload).await
    }

    pub async fn notify_job_finished(&self, job_id: JobId, state: FinishState) -> Result<(), BusError> {
        self.publish_build(&BuildEvent::Finished { job_id: job_id.0, state }).await
    }

    /// Application-level requeue: publishes a `job:restart` event rather
    /// than relying on bus redelivery (spec §4.2, §9 "Restart vs ack").
    pub async fn restart(&self, job_id: JobId) -> Result<(), BusError> {
        self.publish_build(&BuildEvent::Restart { job_id: job_id.0 }).await
    }

    /// Clear the per-job log sequence counter.
    pub fn reset(&self) {
        self.seq.store(0, Ordering::SeqCst);
    }

    async fn publish_build(&self, event: &BuildEvent) -> Result<(), BusError> {
        let payload = serde_json::to_vec(event).map_err(|err| BusError::Encode(err.to_string()))?;
        self.bus.publish(&self.builds_queue, payload).await
    }
}

#[cfg(test)]
#[path = "reporter_tests.rs"]
mod tests;
