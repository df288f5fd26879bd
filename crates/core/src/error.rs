// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared across the worker.

use thiserror::Error;

/// Payload corruption (spec §7, kind 2): unparseable JSON or a missing
/// required key. Always results in ack-and-drop, never a requeue.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed job payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}
