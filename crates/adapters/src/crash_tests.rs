// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn recording_reporter_keeps_context_and_error() {
    let reporter = RecordingCrashReporter::new();
    reporter.capture("instance worker-1", "unclassified: connection reset").await;

    let captured = reporter.captured();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].0, "instance worker-1");
    assert_eq!(captured[0].1, "unclassified: connection reset");
}

#[tokio::test]
async fn noop_reporter_does_not_panic() {
    let reporter = NoopCrashReporter;
    reporter.capture("ctx", "err").await;
}
