// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Multi-instance hosting (spec §9 "Supervisor / multi-instance hosting"):
//! a single process may run more than one [`Instance`], each its own
//! independently scheduled task, under one supervisor that starts, runs,
//! and shuts all of them down together.

use std::sync::Arc;

use build_worker_adapters::{Bus, VmError};
use build_worker_core::{Clock, StatusReport, SystemClock};
use tokio::task::JoinHandle;

use crate::instance::Instance;

pub struct Supervisor<C: Clock = SystemClock> {
    instances: Vec<Arc<Instance<C>>>,
}

impl<C: Clock> Supervisor<C> {
    pub fn new(instances: Vec<Arc<Instance<C>>>) -> Self {
        Self { instances }
    }

    /// `vm.prepare` for every Instance (spec §8 invariant: called exactly
    /// once each, before any Instance is `ready`).
    pub async fn start_all(&self) -> Result<(), VmError> {
        for instance in &self.instances {
            instance.start().await?;
        }
        Ok(())
    }

    /// Spawn each Instance's message pump as its own task (spec §5: "each
    /// Instance's mailbox task is spawned independently").
    pub fn spawn_all(&self, bus: Arc<dyn Bus>) -> Vec<JoinHandle<()>> {
        self.instances
            .iter()
            .map(|instance| {
                let instance = instance.clone();
                let bus = bus.clone();
                tokio::spawn(async move {
                    if let Err(err) = instance.run(bus.as_ref()).await {
                        tracing::error!(instance = %instance.name(), error = %err, "instance pump exited with an error");
                    }
                })
            })
            .collect()
    }

    pub async fn stop_all(&self, force: bool) {
        for instance in &self.instances {
            instance.stop(force).await;
        }
    }

    pub fn statuses(&self) -> Vec<StatusReport> {
        self.instances.iter().map(|i| i.status()).collect()
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
