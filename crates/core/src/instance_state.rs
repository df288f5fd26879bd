// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Instance lifecycle state machine (spec §4.1).

use serde::{Deserialize, Serialize};

/// Lifecycle state of a worker Instance.
///
/// Legal transitions are enforced by the daemon's state machine, not by this
/// type itself — this is a plain data carrier so it can be serialized into a
/// [`StatusReport`] for observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Created,
    Starting,
    Ready,
    Working,
    Stopping,
    Stopped,
    Errored,
}

crate::simple_display! {
    InstanceState {
        Created => "created",
        Starting => "starting",
        Ready => "ready",
        Working => "working",
        Stopping => "stopping",
        Stopped => "stopped",
        Errored => "errored",
    }
}

impl InstanceState {
    pub fn is_working(self) -> bool {
        matches!(self, InstanceState::Working)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, InstanceState::Stopped)
    }
}

/// Terminal outcome of a single job, as reported to the `builds` queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishState {
    Passed,
    Failed,
    Errored,
    Canceled,
}

crate::simple_display! {
    FinishState {
        Passed => "passed",
        Failed => "failed",
        Errored => "errored",
        Canceled => "canceled",
    }
}

/// Snapshot of a [`StatusReport`]'s current job, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSnapshot {
    pub job_id: i64,
    pub repository_slug: String,
}

/// Emitted to every registered observer after a committed state change
/// (spec §4.1: "observers see only committed states").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub name: String,
    pub host: String,
    pub state: InstanceState,
    pub last_error: Option<String>,
    pub payload: Option<PayloadSnapshot>,
}

#[cfg(test)]
#[path = "instance_state_tests.rs"]
mod tests;
