// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const DEFAULTS: Timeouts = Timeouts { hard_limit_secs: 7200, log_silence_secs: 600 };

#[test]
fn decode_happy_path() {
    let payload = br#"{"uuid":"u1","job":{"id":42},"repository":{"slug":"a/b"},"config":{"language":"ruby"}}"#;
    let envelope = JobEnvelope::decode(payload).unwrap();

    assert_eq!(envelope.job_id, JobId(42));
    assert_eq!(envelope.repository_slug, "a/b");
    assert_eq!(envelope.config.language, "ruby");
    assert_eq!(envelope.uuid, "u1");
}

#[test]
fn decode_rejects_malformed_json() {
    let payload = b"not-json";
    assert!(JobEnvelope::decode(payload).is_err());
}

#[test]
fn decode_rejects_missing_required_key() {
    let payload = br#"{"uuid":"u1","repository":{"slug":"a/b"},"config":{"language":"ruby"}}"#;
    assert!(JobEnvelope::decode(payload).is_err());
}

#[test]
fn decode_preserves_unknown_keys_by_ignoring_them() {
    let payload = br#"{
        "uuid":"u1",
        "job":{"id":42,"number":"1.1"},
        "repository":{"slug":"a/b","id":99},
        "config":{"language":"ruby","unexpected":"value"}
    }"#;
    let envelope = JobEnvelope::decode(payload).unwrap();
    assert_eq!(envelope.job_id, JobId(42));
}

#[test]
fn timeouts_resolve_prefers_positive_per_job_value() {
    let raw = Some(RawTimeouts { hard_limit: Some(120), log_silence: None });
    let resolved = Timeouts::resolve(raw, DEFAULTS);
    assert_eq!(resolved.hard_limit_secs, 120);
    assert_eq!(resolved.log_silence_secs, DEFAULTS.log_silence_secs);
}

#[test]
fn timeouts_resolve_falls_back_on_zero_or_absent() {
    let raw = Some(RawTimeouts { hard_limit: Some(0), log_silence: None });
    let resolved = Timeouts::resolve(raw, DEFAULTS);
    assert_eq!(resolved.hard_limit_secs, DEFAULTS.hard_limit_secs);
    assert_eq!(resolved.log_silence_secs, DEFAULTS.log_silence_secs);
}

#[test]
fn timeouts_resolve_with_no_override_uses_defaults() {
    let resolved = Timeouts::resolve(None, DEFAULTS);
    assert_eq!(resolved, DEFAULTS);
}
