// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VM handle contract (spec §4.2/§6). The real image provisioning and SSH
//! session primitive are an out-of-scope external collaborator.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("vm fatal error: {0}")]
    Fatal(String),
}

/// Parameters passed to `vm.sandboxed` (spec §4.2 step 4): everything the
/// provider needs to pick and provision an image.
#[derive(Debug, Clone)]
pub struct SandboxOpts {
    pub language: String,
    pub job_id: i64,
    pub custom_image: Option<String>,
    pub dist: Option<String>,
    pub group: Option<String>,
}

/// The live SSH-equivalent session inside a provisioned sandbox.
pub trait VmSession: Send + Sync {
    // NOTE(contract): part of the session handle shape a real runner would
    // use to open a shell; no in-process runner reads it yet.
    #[allow(dead_code)]
    fn session_handle(&self) -> &str;
    fn full_name(&self) -> &str;
}

/// A provisioned, not-yet-released sandbox. Dropping this value without
/// calling `release` would leak the underlying VM — callers must release on
/// every exit path (success, error, or cancellation).
#[async_trait]
pub trait VmSandbox: Send {
    fn session(&self) -> &dyn VmSession;
    fn full_name(&self) -> &str;
    async fn release(self: Box<Self>);
}

#[async_trait]
pub trait VmProvider: Send + Sync {
    /// Provision whatever the provider needs ahead of time (spec: `created -> starting`).
    async fn prepare(&self) -> Result<(), VmError>;

    /// Enter a fresh sandbox. The caller is responsible for calling
    /// `release` on the returned handle once the job's work is done.
    async fn begin_sandbox(&self, opts: SandboxOpts) -> Result<Box<dyn VmSandbox>, VmError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeVmProvider;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    pub struct FakeVmSession {
        full_name: String,
    }

    impl VmSession for FakeVmSession {
        fn session_handle(&self) -> &str {
            "fake-session"
        }

        fn full_name(&self) -> &str {
            &self.full_name
        }
    }

    pub struct FakeVmSandbox {
        session: FakeVmSession,
        released: std::sync::Arc<AtomicBool>,
    }

    #[async_trait]
    impl VmSandbox for FakeVmSandbox {
        fn session(&self) -> &dyn VmSession {
            &self.session
        }

        fn full_name(&self) -> &str {
            self.session.full_name()
        }

        async fn release(self: Box<Self>) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    /// A [`VmProvider`] with no real provisioning: `begin_sandbox` returns a
    /// canned session immediately, or a fatal error when configured to.
    #[derive(Default)]
    pub struct FakeVmProvider {
        prepare_count: AtomicUsize,
        fail_prepare: AtomicBool,
        fail_sandbox: AtomicBool,
        last_release: std::sync::Arc<AtomicBool>,
    }

    impl FakeVmProvider {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn prepare_count(&self) -> usize {
            self.prepare_count.load(Ordering::SeqCst)
        }

        pub fn set_fail_prepare(&self, fail: bool) {
            self.fail_prepare.store(fail, Ordering::SeqCst);
        }

        pub fn set_fail_sandbox(&self, fail: bool) {
            self.fail_sandbox.store(fail, Ordering::SeqCst);
        }

        /// Whether the most recently issued sandbox has been released.
        pub fn last_sandbox_released(&self) -> bool {
            self.last_release.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VmProvider for FakeVmProvider {
        async fn prepare(&self) -> Result<(), VmError> {
            self.prepare_count.fetch_add(1, Ordering::SeqCst);
            if self.fail_prepare.load(Ordering::SeqCst) {
                return Err(VmError::Fatal("fake prepare failure".into()));
            }
            Ok(())
        }

        async fn begin_sandbox(&self, opts: SandboxOpts) -> Result<Box<dyn VmSandbox>, VmError> {
            if self.fail_sandbox.load(Ordering::SeqCst) {
                return Err(VmError::Fatal("fake sandbox provisioning failure".into()));
            }
            self.last_release.store(false, Ordering::SeqCst);
            Ok(Box::new(FakeVmSandbox {
                session: FakeVmSession { full_name: format!("fake-vm-{}", opts.job_id) },
                released: self.last_release.clone(),
            }))
        }
    }
}

#[cfg(test)]
#[path = "vm_tests.rs"]
mod tests;
