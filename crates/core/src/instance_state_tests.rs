// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn working_state_detection() {
    assert!(InstanceState::Working.is_working());
    assert!(!InstanceState::Ready.is_working());
}

#[test]
fn display_matches_snake_case_names() {
    assert_eq!(InstanceState::Starting.to_string(), "starting");
    assert_eq!(FinishState::Canceled.to_string(), "canceled");
}

#[test]
fn status_report_round_trips_through_json() {
    let report = StatusReport {
        name: "worker-1".into(),
        host: "box-a".into(),
        state: InstanceState::Working,
        last_error: None,
        payload: Some(PayloadSnapshot { job_id: 42, repository_slug: "a/b".into() }),
    };
    let json = serde_json::to_string(&report).unwrap();
    let back: StatusReport = serde_json::from_str(&json).unwrap();
    assert_eq!(report, back);
}
