// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job runner contract (spec §4.2/§6): the black-box callee that drives the
//! VM shell session line-by-line and enforces timeouts.

use async_trait::async_trait;
use build_worker_core::{JobEnvelope, Timeouts};
use thiserror::Error;

use crate::reporter::Reporter;
use crate::vm::VmSession;

#[derive(Debug, Error)]
pub enum RunnerError {
    /// Raised when the VM underneath the runner dies mid-job. Classified the
    /// same as `Connection` (spec §4.2 outcome table): requeue, no cooldown.
    #[error("vm fatal error: {0}")]
    VmFatal(String),
    #[error("runner connection error: {0}")]
    Connection(String),
    /// Anything else the runner surfaces. Classified as "unclassified"
    /// (spec §7 kind 3): requeue, `errored` transition, cooldown.
    #[error("job runner error: {0}")]
    Other(String),
}

/// Constructed per job from the payload, the VM session, and the Instance's
/// reporter. `run` blocks until the job's script finishes, times out, or is
/// cancelled; `cancel` must be idempotent and safe to call from another
/// thread while `run` is in flight.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self) -> Result<(), RunnerError>;
    fn cancel(&self);
}

/// Inputs used to construct a [`JobRunner`] for one job (spec §4.2 step 4).
pub struct RunnerContext<'a> {
    pub envelope: &'a JobEnvelope,
    // NOTE(contract): the fake runner doesn't drive a session; a real runner
    // would read these to open the shell and enforce timeouts.
    #[allow(dead_code)]
    pub session: &'a dyn VmSession,
    pub reporter: Reporter,
    #[allow(dead_code)]
    pub vm_full_name: &'a str,
    #[allow(dead_code)]
    pub timeouts: Timeouts,
    #[allow(dead_code)]
    pub instance_name: &'a str,
}

pub trait RunnerFactory: Send + Sync {
    fn build(&self, ctx: RunnerContext<'_>) -> Box<dyn JobRunner>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRunnerBehavior, FakeRunnerFactory};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use build_worker_core::{FinishState, JobId};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    /// Controls what a [`FakeRunner`] does when `run()` is called.
    #[derive(Clone)]
    pub enum FakeRunnerBehavior {
        /// Emit a couple of log lines, then a `Passed` finish, then return `Ok`.
        Succeed,
        VmFatal(String),
        ConnectionError(String),
        Unclassified(String),
        /// Block until `cancel()` is called, then self-report `Canceled` and
        /// return `Ok` — mirroring a real runner that owns its own
        /// cancellation reporting once it is already driving the VM.
        HangUntilCancelled,
    }

    /// A [`JobRunner`] driven entirely by [`FakeRunnerBehavior`], for tests.
    pub struct FakeRunner {
        job_id: JobId,
        reporter: Reporter,
        behavior: FakeRunnerBehavior,
        cancelled: Arc<AtomicBool>,
        notify: Arc<Notify>,
    }

    #[async_trait]
    impl JobRunner for FakeRunner {
        async fn run(&self) -> Result<(), RunnerError> {
            match &self.behavior {
                FakeRunnerBehavior::Succeed => {
                    let _ = self.reporter.send_log(self.job_id, "building...\n").await;
                    let _ = self.reporter.notify_job_finished(self.job_id, FinishState::Passed).await;
                    Ok(())
                }
                FakeRunnerBehavior::VmFatal(msg) => Err(RunnerError::VmFatal(msg.clone())),
                FakeRunnerBehavior::ConnectionError(msg) => Err(RunnerError::Connection(msg.clone())),
                FakeRunnerBehavior::Unclassified(msg) => Err(RunnerError::Other(msg.clone())),
                FakeRunnerBehavior::HangUntilCancelled => {
                    if !self.cancelled.load(Ordering::SeqCst) {
                        self.notify.notified().await;
                    }
                    let _ =
                        self.reporter.notify_job_finished(self.job_id, FinishState::Canceled).await;
                    Ok(())
                }
            }
        }

        fn cancel(&self) {
            self.cancelled.store(true, Ordering::SeqCst);
            self.notify.notify_waiters();
        }
    }

    /// Builds a [`FakeRunner`] with a fixed, test-chosen [`FakeRunnerBehavior`].
    pub struct FakeRunnerFactory {
        behavior: FakeRunnerBehavior,
    }

    impl FakeRunnerFactory {
        pub fn new(behavior: FakeRunnerBehavior) -> Self {
            Self { behavior }
        }
    }

    impl RunnerFactory for FakeRunnerFactory {
        fn build(&self, ctx: RunnerContext<'_>) -> Box<dyn JobRunner> {
            Box::new(FakeRunner {
                job_id: ctx.envelope.job_id,
                reporter: ctx.reporter,
                behavior: self.behavior.clone(),
                cancelled: Arc::new(AtomicBool::new(false)),
                notify: Arc::new(Notify::new()),
            })
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
