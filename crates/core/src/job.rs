// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job envelope: the decoded contents of one `builds` queue delivery.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DecodeError;

/// Numeric job identifier as carried on the wire (`job.id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub i64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-job timeout overrides as decoded from the payload, in seconds.
///
/// A value of `0` or absent means "use the config default" (see [`Timeouts::resolve`]).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawTimeouts {
    #[serde(default)]
    pub hard_limit: Option<u64>,
    #[serde(default)]
    pub log_silence: Option<u64>,
}

/// Timeouts actually enforced for a job, after resolving payload overrides
/// against the worker's configured defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub hard_limit_secs: u64,
    pub log_silence_secs: u64,
}

impl Timeouts {
    /// `per_job_value if present and > 0, else config_default` (spec §4.6).
    pub fn resolve(raw: Option<RawTimeouts>, defaults: Timeouts) -> Timeouts {
        let raw = raw.unwrap_or_default();
        Timeouts {
            hard_limit_secs: raw
                .hard_limit
                .filter(|v| *v > 0)
                .unwrap_or(defaults.hard_limit_secs),
            log_silence_secs: raw
                .log_silence
                .filter(|v| *v > 0)
                .unwrap_or(defaults.log_silence_secs),
        }
    }
}

/// `config` section of the payload — everything the VM sandbox needs to know
/// about how to provision the job's image.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobConfigSection {
    pub language: String,
    #[serde(default)]
    pub dist: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub osx_image: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawJobRef {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    uuid: Option<String>,
    job: RawJobRef,
    repository: RawRepository,
    config: JobConfigSection,
    #[serde(default)]
    timeouts: Option<RawTimeouts>,
}

/// Decoded contents of a single `builds` queue delivery.
///
/// Unknown keys in the raw payload are preserved by `serde_json` discarding
/// them silently; only the keys listed in spec §6 are ever read.
#[derive(Debug, Clone)]
pub struct JobEnvelope {
    pub job_id: JobId,
    pub repository_slug: String,
    pub config: JobConfigSection,
    /// Opaque trace token threaded through `work -> runner -> reporter`.
    pub uuid: String,
    raw_timeouts: Option<RawTimeouts>,
}

impl JobEnvelope {
    /// Decode a raw delivery payload. Any structural problem (invalid JSON,
    /// or a required key missing/mistyped) is a single [`DecodeError`] —
    /// the caller acks and drops, it never requeues (spec §4.2 step 1).
    pub fn decode(raw_payload: &[u8]) -> Result<Self, DecodeError> {
        let raw: RawEnvelope = serde_json::from_slice(raw_payload)?;
        Ok(JobEnvelope {
            job_id: JobId(raw.job.id),
            repository_slug: raw.repository.slug,
            config: raw.config,
            uuid: raw.uuid.unwrap_or_default(),
            raw_timeouts: raw.timeouts,
        })
    }

    /// Resolve this job's timeouts against the worker's configured defaults.
    pub fn resolved_timeouts(&self, defaults: Timeouts) -> Timeouts {
        Timeouts::resolve(self.raw_timeouts, defaults)
    }
}

#[cfg(any(test, feature = "test-support"))]
impl JobEnvelope {
    /// Build a minimal envelope for tests, bypassing JSON decoding.
    pub fn test_new(job_id: i64, repository_slug: impl Into<String>, language: impl Into<String>) -> Self {
        JobEnvelope {
            job_id: JobId(job_id),
            repository_slug: repository_slug.into(),
            config: JobConfigSection {
                language: language.into(),
                dist: None,
                group: None,
                osx_image: None,
            },
            uuid: String::new(),
            raw_timeouts: None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
