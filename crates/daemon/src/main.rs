// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `build-worker` - runs one or more worker [`build_worker_daemon::Instance`]s
//! against the in-process bus/VM adapters until a shutdown signal arrives.

use std::sync::Arc;

use build_worker_adapters::{
    BusError, FakeRunnerBehavior, FakeRunnerFactory, FakeVmProvider, InMemoryBus, Reporter,
    TracingCrashReporter, TracingMetricsSink, VmError,
};
use build_worker_core::InstanceName;
use build_worker_daemon::{
    AggregatingObserver, ConfigError, Instance, InstanceOptions, Supervisor, TracingObserver,
    WorkerConfig,
};
use clap::Parser;
use thiserror::Error;

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Vm(#[from] VmError),
    #[error(transparent)]
    Bus(#[from] BusError),
    #[error(transparent)]
    Signal(#[from] std::io::Error),
}

/// Run the build worker daemon.
#[derive(Parser)]
#[command(name = "build-worker", version, about)]
struct Cli {
    /// Number of worker instances to host in this process.
    #[arg(long, default_value_t = 1)]
    instances: usize,

    /// Overrides `BW_HOST` / the config file's `host`.
    #[arg(long)]
    host: Option<String>,

    /// Overrides `BW_BUILDS_QUEUE` / the config file's `builds_queue`.
    #[arg(long)]
    builds_queue: Option<String>,

    /// Overrides `BW_LOGS_QUEUE` / the config file's `logs_queue`.
    #[arg(long)]
    logs_queue: Option<String>,
}

impl Cli {
    fn apply(&self, mut config: WorkerConfig) -> WorkerConfig {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(queue) = &self.builds_queue {
            config.builds_queue = queue.clone();
        }
        if let Some(queue) = &self.logs_queue {
            config.logs_queue = queue.clone();
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<(), MainError> {
    build_worker_daemon::logging::init();
    let cli = Cli::parse();
    let config = cli.apply(WorkerConfig::load()?);

    let bus = Arc::new(InMemoryBus::new());
    let aggregator = Arc::new(AggregatingObserver::new());

    let instances: Vec<_> = (0..cli.instances.max(1))
        .map(|n| {
            let name = InstanceName::new(format!("{}-{}", config.host, n));
            let reporter = Reporter::new(
                bus.clone() as Arc<_>,
                config.reporting_builds_queue.clone(),
                config.reporting_logs_queue.clone(),
            );
            let instance = Arc::new(Instance::new(
                InstanceOptions {
                    name,
                    host: config.host.clone(),
                    queue_name: config.builds_queue.clone(),
                    default_timeouts: config.default_timeouts(),
                    cooldown_secs: config.cooldown_secs,
                    shutdown_grace_secs: config.shutdown_grace_secs,
                },
                Arc::new(FakeVmProvider::new()),
                Arc::new(FakeRunnerFactory::new(FakeRunnerBehavior::Succeed)),
                reporter,
                build_worker_core::SystemClock,
                Arc::new(TracingMetricsSink),
                Arc::new(TracingCrashReporter),
            ));
            instance.register_observer(Arc::new(TracingObserver));
            instance.register_observer(aggregator.clone());
            instance
        })
        .collect();

    let supervisor = Supervisor::new(instances);
    supervisor.start_all().await?;
    let handles = supervisor.spawn_all(bus.clone() as Arc<_>);

    tracing::info!(count = handles.len(), "build worker instances started");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, draining in-flight jobs");
    supervisor.stop_all(false).await;

    for handle in handles {
        let _ = handle.await;
    }
    Ok(())
}
