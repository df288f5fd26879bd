// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use build_worker_core::InstanceState;

fn report(state: InstanceState) -> StatusReport {
    StatusReport { name: "worker-1".into(), host: "host-a".into(), state, last_error: None, payload: None }
}

#[test]
fn recording_observer_keeps_reports_in_order() {
    let observer = RecordingObserver::new();
    observer.on_status(&report(InstanceState::Starting));
    observer.on_status(&report(InstanceState::Ready));

    let reports = observer.reports();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].state, InstanceState::Starting);
    assert_eq!(reports[1].state, InstanceState::Ready);
}

#[test]
fn aggregating_observer_keeps_only_the_latest_report_per_instance() {
    let observer = AggregatingObserver::new();
    observer.on_status(&report(InstanceState::Starting));
    observer.on_status(&report(InstanceState::Ready));

    let mut other = report(InstanceState::Working);
    other.name = "worker-2".into();
    observer.on_status(&other);

    let snapshot = observer.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].name, "worker-1");
    assert_eq!(snapshot[0].state, InstanceState::Ready);
    assert_eq!(snapshot[1].name, "worker-2");
}
