// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bus::InMemoryBus;
use crate::vm::FakeVmProvider;
use crate::vm::VmProvider;
use build_worker_core::{JobEnvelope, Timeouts};
use std::sync::Arc;

fn ctx_parts() -> (Arc<InMemoryBus>, JobEnvelope, Timeouts) {
    let bus = Arc::new(InMemoryBus::new());
    let envelope = JobEnvelope::test_new(42, "a/b", "ruby");
    let timeouts = Timeouts { hard_limit_secs: 1, log_silence_secs: 1 };
    (bus, envelope, timeouts)
}

#[tokio::test]
async fn succeed_behavior_reports_log_and_finish_then_returns_ok() {
    let (bus, envelope, timeouts) = ctx_parts();
    let reporter = Reporter::new(bus.clone(), "reporting.jobs.builds", "reporting.jobs.logs");
    let vm = FakeVmProvider::new();
    let sandbox = vm
        .begin_sandbox(crate::vm::SandboxOpts {
            language: "ruby".into(),
            job_id: 42,
            custom_image: None,
            dist: None,
            group: None,
        })
        .await
        .unwrap();

    let factory = FakeRunnerFactory::new(FakeRunnerBehavior::Succeed);
    let runner = factory.build(RunnerContext {
        envelope: &envelope,
        session: sandbox.session(),
        reporter,
        vm_full_name: sandbox.full_name(),
        timeouts,
        instance_name: "worker-1",
    });

    runner.run().await.unwrap();
    assert_eq!(bus.published("reporting.jobs.logs").len(), 1);
    assert_eq!(bus.published("reporting.jobs.builds").len(), 1);
}

#[tokio::test]
async fn vm_fatal_behavior_surfaces_as_vm_fatal_error() {
    let (bus, envelope, timeouts) = ctx_parts();
    let reporter = Reporter::new(bus, "reporting.jobs.builds", "reporting.jobs.logs");
    let factory = FakeRunnerFactory::new(FakeRunnerBehavior::VmFatal("disk full".into()));
    let runner = factory.build(RunnerContext {
        envelope: &envelope,
        session: &NoopSession,
        reporter,
        vm_full_name: "vm-1",
        timeouts,
        instance_name: "worker-1",
    });

    let err = runner.run().await.unwrap_err();
    assert!(matches!(err, RunnerError::VmFatal(_)));
}

#[tokio::test]
async fn cancel_wakes_up_a_hanging_runner_and_it_self_reports_cancelled() {
    let (bus, envelope, timeouts) = ctx_parts();
    let reporter = Reporter::new(bus.clone(), "reporting.jobs.builds", "reporting.jobs.logs");
    let factory = FakeRunnerFactory::new(FakeRunnerBehavior::HangUntilCancelled);
    let runner = factory.build(RunnerContext {
        envelope: &envelope,
        session: &NoopSession,
        reporter,
        vm_full_name: "vm-1",
        timeouts,
        instance_name: "worker-1",
    });

    let run_fut = runner.run();
    runner.cancel();
    run_fut.await.unwrap();

    let published = bus.published("reporting.jobs.builds");
    assert!(String::from_utf8_lossy(&published[0]).contains("canceled"));
}

struct NoopSession;
impl crate::vm::VmSession for NoopSession {
    fn session_handle(&self) -> &str {
        "noop"
    }
    fn full_name(&self) -> &str {
        "noop"
    }
}
