// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Instance state machine (spec §4.1-§4.4): owns one subscription's
//! worth of message processing, VM lifecycle, and reporter fan-out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use build_worker_adapters::{
    Bus, CrashReporter, Delivery, JobRunner, MetricsSink, Reporter, RunnerContext, RunnerError,
    RunnerFactory, SandboxOpts, Subscription, VmProvider,
};
use build_worker_core::{
    Clock, FinishState, InstanceName, InstanceState, JobEnvelope, JobId, PayloadSnapshot,
    StatusReport, SystemClock, Timeouts,
};
use parking_lot::{Mutex, RwLock};
use tracing::Instrument;

use crate::observer::Observer;

const REQUEUE_COUNTER: &str = "worker.job.requeue";

struct InstanceInner {
    state: InstanceState,
    last_error: Option<String>,
    payload: Option<PayloadSnapshot>,
}

/// Fixed parameters an Instance is built from (spec §3 `WorkerConfig`
/// entries that are per-Instance rather than process-global).
pub struct InstanceOptions {
    pub name: InstanceName,
    pub host: String,
    pub queue_name: String,
    pub default_timeouts: Timeouts,
    pub cooldown_secs: u64,
    pub shutdown_grace_secs: u64,
}

/// A worker Instance: one subscription to the builds queue, one VM
/// provider, one runner factory, one reporter. Generic over [`Clock`] so
/// tests can run the 10s cooldown without actually waiting 10 seconds.
pub struct Instance<C: Clock = SystemClock> {
    name: InstanceName,
    host: String,
    queue_name: String,
    vm: Arc<dyn VmProvider>,
    runner_factory: Arc<dyn RunnerFactory>,
    reporter: Reporter,
    clock: C,
    metrics: Arc<dyn MetricsSink>,
    crash: Arc<dyn CrashReporter>,
    observers: RwLock<Vec<Arc<dyn Observer>>>,
    default_timeouts: Timeouts,
    cooldown_secs: u64,
    shutdown_grace_secs: u64,
    inner: Mutex<InstanceInner>,
    job_canceled: AtomicBool,
    shutdown_requested: AtomicBool,
    force_stop_requested: AtomicBool,
    current_runner: Mutex<Option<Arc<dyn JobRunner>>>,
}

#[allow(clippy::too_many_arguments)]
impl<C: Clock> Instance<C> {
    pub fn new(
        opts: InstanceOptions,
        vm: Arc<dyn VmProvider>,
        runner_factory: Arc<dyn RunnerFactory>,
        reporter: Reporter,
        clock: C,
        metrics: Arc<dyn MetricsSink>,
        crash: Arc<dyn CrashReporter>,
    ) -> Self {
        Self {
            name: opts.name,
            host: opts.host,
            queue_name: opts.queue_name,
            vm,
            runner_factory,
            reporter,
            clock,
            metrics,
            crash,
            observers: RwLock::new(Vec::new()),
            default_timeouts: opts.default_timeouts,
            cooldown_secs: opts.cooldown_secs,
            shutdown_grace_secs: opts.shutdown_grace_secs,
            inner: Mutex::new(InstanceInner {
                state: InstanceState::Created,
                last_error: None,
                payload: None,
            }),
            job_canceled: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
            force_stop_requested: AtomicBool::new(false),
            current_runner: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &InstanceName {
        &self.name
    }

    pub fn state(&self) -> InstanceState {
        self.inner.lock().state
    }

    /// Current [`StatusReport`] snapshot, for a supervisor polling health
    /// without waiting on the observer fan-out.
    pub fn status(&self) -> StatusReport {
        let inner = self.inner.lock();
        StatusReport {
            name: self.name.as_str().to_string(),
            host: self.host.clone(),
            state: inner.state,
            last_error: inner.last_error.clone(),
            payload: inner.payload.clone(),
        }
    }

    pub fn register_observer(&self, observer: Arc<dyn Observer>) {
        self.observers.write().push(observer);
    }

    /// `created -> starting`: provisions the VM, then transitions to
    /// `ready` on success (spec §4.1).
    pub async fn start(&self) -> Result<(), build_worker_adapters::VmError> {
        self.set_state(InstanceState::Starting);
        self.vm.prepare().await?;
        self.set_state(InstanceState::Ready);
        Ok(())
    }

    /// Subscribe to the builds queue and drive the message pump until the
    /// subscription ends or a stop request finishes it.
    pub async fn run(&self, bus: &dyn Bus) -> Result<(), build_worker_adapters::BusError> {
        let mut subscription = bus.subscribe(&self.queue_name).await?;
        loop {
            if self.force_stop_requested.load(Ordering::SeqCst) {
                subscription.unsubscribe();
                break;
            }
            match subscription.recv().await {
                Some(delivery) => self.process(delivery).await,
                None => break,
            }
            if self.state().is_terminal() {
                subscription.unsubscribe();
                break;
            }
        }
        Ok(())
    }

    /// Out-of-band cancel (spec §4.3). Callable from any context, never
    /// blocks on the current job.
    pub fn cancel(&self) {
        let runner = self.current_runner.lock().clone();
        match runner {
            Some(runner) => runner.cancel(),
            None => self.job_canceled.store(true, Ordering::SeqCst),
        }
    }

    /// Graceful or forced shutdown (spec §4.4). Graceful: if a job is in
    /// flight, only flags the request — `finish_tail` drives the actual
    /// `stopping -> stopped` transition. If idle, transitions immediately
    /// after a short grace period. Forced: flags the pump loop to
    /// unsubscribe and exit on its next iteration; the caller is
    /// responsible for aborting the pump task if it must stop *now*.
    pub async fn stop(&self, force: bool) {
        if force {
            self.force_stop_requested.store(true, Ordering::SeqCst);
            self.set_state(InstanceState::Stopped);
            return;
        }

        self.shutdown_requested.store(true, Ordering::SeqCst);
        if !self.state().is_working() {
            self.set_state(InstanceState::Stopping);
            self.clock.sleep(std::time::Duration::from_secs(self.shutdown_grace_secs)).await;
            self.set_state(InstanceState::Stopped);
        }
    }

    /// Message processing contract (spec §4.2).
    pub async fn process(&self, delivery: Delivery) {
        let envelope = match JobEnvelope::decode(&delivery.payload) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed job payload");
                delivery.ack();
                return;
            }
        };

        self.job_canceled.store(false, Ordering::SeqCst);
        let timeouts = envelope.resolved_timeouts(self.default_timeouts);
        let job_id = envelope.job_id;

        let span = tracing::info_span!(
            "job",
            instance = self.name.as_str(),
            job_id = job_id.0,
            trace_id = envelope.uuid.as_str(),
        );

        async move {
            {
                let mut inner = self.inner.lock();
                inner.last_error = None;
                inner.payload = Some(PayloadSnapshot {
                    job_id: job_id.0,
                    repository_slug: envelope.repository_slug.clone(),
                });
            }
            self.set_state(InstanceState::Working);

            if let Err(err) = self.reporter.notify_job_received(job_id).await {
                tracing::warn!(error = %err, "failed to publish job:received");
            }

            let outcome = self.work(&envelope, timeouts).await;
            self.finish(delivery, job_id, outcome).await;
        }
        .instrument(span)
        .await
    }

    /// Steps 4-5 of §4.2: enter the sandbox, run the job, classify the
    /// outcome. Returns the classification for `finish` to act on.
    async fn work(&self, envelope: &JobEnvelope, timeouts: Timeouts) -> WorkOutcome {
        let opts = SandboxOpts {
            language: envelope.config.language.clone(),
            job_id: envelope.job_id.0,
            custom_image: envelope.config.osx_image.clone(),
            dist: envelope.config.dist.clone(),
            group: envelope.config.group.clone(),
        };

        let sandbox = match self.vm.begin_sandbox(opts).await {
            Ok(sandbox) => sandbox,
            Err(err) => return WorkOutcome::TransientInfra(err.to_string()),
        };

        if self.job_canceled.load(Ordering::SeqCst) {
            let _ =
                self.reporter.send_log(envelope.job_id, "\n\nDone: Job Cancelled\n").await;
            let _ = self.reporter.notify_job_finished(envelope.job_id, FinishState::Canceled).await;
            sandbox.release().await;
            return WorkOutcome::Cancelled;
        }

        let ctx = RunnerContext {
            envelope,
            session: sandbox.session(),
            reporter: self.reporter.clone(),
            vm_full_name: sandbox.full_name(),
            timeouts,
            instance_name: self.name.as_str(),
        };
        let runner: Arc<dyn JobRunner> = Arc::from(self.runner_factory.build(ctx));
        *self.current_runner.lock() = Some(runner.clone());

        let result = runner.run().await;
        *self.current_runner.lock() = None;
        sandbox.release().await;

        match result {
            Ok(()) => WorkOutcome::Normal,
            Err(RunnerError::VmFatal(msg)) => WorkOutcome::TransientInfra(msg),
            Err(RunnerError::Connection(msg)) => WorkOutcome::TransientInfra(msg),
            Err(err @ RunnerError::Other(_)) => {
                if self.job_canceled.load(Ordering::SeqCst) {
                    WorkOutcome::Cancelled
                } else {
                    WorkOutcome::Unclassified(err)
                }
            }
        }
    }

    /// Step 6 of §4.2: ack, reset the reporter sequence, and resolve the
    /// terminal state (spec §4.1, §9 "Two `finish` responsibilities").
    async fn finish(&self, delivery: Delivery, job_id: JobId, outcome: WorkOutcome) {
        match outcome {
            WorkOutcome::Normal | WorkOutcome::Cancelled => {}
            WorkOutcome::TransientInfra(_) => {
                if let Err(err) = self.reporter.restart(job_id).await {
                    tracing::warn!(error = %err, "failed to publish job:restart");
                }
                self.metrics.incr_counter(REQUEUE_COUNTER);
            }
            WorkOutcome::Unclassified(ref err) => {
                if let Err(err) = self.reporter.restart(job_id).await {
                    tracing::warn!(error = %err, "failed to publish job:restart");
                }
                self.metrics.incr_counter(REQUEUE_COUNTER);
                let rendered = format!("{err}\n{err:?}");
                self.crash.capture(self.name.as_str(), &rendered).await;
                self.inner.lock().last_error = Some(rendered);
                self.set_state(InstanceState::Errored);
            }
        }

        delivery.ack();
        self.inner.lock().payload = None;
        self.reporter.reset();

        if matches!(outcome, WorkOutcome::Unclassified(_)) {
            self.clock.sleep(std::time::Duration::from_secs(self.cooldown_secs)).await;
        }

        if self.shutdown_requested.load(Ordering::SeqCst) {
            self.set_state(InstanceState::Stopping);
            self.clock.sleep(std::time::Duration::from_secs(self.shutdown_grace_secs)).await;
            self.set_state(InstanceState::Stopped);
        } else {
            self.set_state(InstanceState::Ready);
        }
    }

    fn set_state(&self, state: InstanceState) {
        let report = {
            let mut inner = self.inner.lock();
            inner.state = state;
            StatusReport {
                name: self.name.as_str().to_string(),
                host: self.host.clone(),
                state: inner.state,
                last_error: inner.last_error.clone(),
                payload: inner.payload.clone(),
            }
        };
        for observer in self.observers.read().iter() {
            observer.on_status(&report);
        }
    }
}

/// Classification of a completed `work()` call, feeding the outcome table
/// in spec §4.2.
enum WorkOutcome {
    Normal,
    Cancelled,
    /// VM fatal / runner connection failure: requeue, no cooldown, no
    /// `errored` transition (spec §7 kind 1).
    TransientInfra(String),
    /// Anything else: requeue, `errored` transition, cooldown (spec §7 kind 3).
    /// Carries the original [`RunnerError`] so `finish` can render both its
    /// `Display` message and its `Debug` chain into `last_error`.
    Unclassified(RunnerError),
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
