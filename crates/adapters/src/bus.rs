// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message-bus contract (spec §6). The real connection/channel/consumer
//! primitives are an out-of-scope external collaborator; this module fixes
//! only the shape the daemon depends on, plus an in-memory implementation
//! used for tests and local runs.

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus connection error: {0}")]
    Connection(String),
    #[error("queue not declared: {0}")]
    UnknownQueue(String),
    #[error("failed to encode message payload: {0}")]
    Encode(String),
}

/// One message instance from the bus, carrying a payload and an ack token.
///
/// `ack()` consumes `self`, so "exactly one ack per delivery" (spec §8) is a
/// type-level guarantee rather than a runtime check.
pub struct Delivery {
    pub payload: Vec<u8>,
    pub redelivered: bool,
    ack_fn: Option<Box<dyn FnOnce() + Send>>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, redelivered: bool, ack_fn: impl FnOnce() + Send + 'static) -> Self {
        Self { payload, redelivered, ack_fn: Some(Box::new(ack_fn)) }
    }

    /// Acknowledge this delivery. The delivery is always acked regardless of
    /// outcome (spec §4.2) — requeuing happens at the application level via
    /// [`crate::reporter::Reporter::restart`], never via bus redelivery.
    pub fn ack(mut self) {
        if let Some(f) = self.ack_fn.take() {
            f();
        }
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("payload_len", &self.payload.len())
            .field("redelivered", &self.redelivered)
            .finish()
    }
}

/// A live subscription to one queue. Single-writer: only the Instance that
/// created it ever calls `recv`/`unsubscribe` (spec §5).
#[async_trait]
pub trait Subscription: Send {
    async fn recv(&mut self) -> Option<Delivery>;

    /// Idempotent: a no-op if already unsubscribed (spec §4.4).
    fn unsubscribe(&mut self);
}

#[async_trait]
pub trait Bus: Send + Sync {
    async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), BusError>;
    async fn subscribe(&self, queue: &str) -> Result<Box<dyn Subscription>, BusError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use inmemory::InMemoryBus;

#[cfg(any(test, feature = "test-support"))]
mod inmemory {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    #[derive(Clone, Default)]
    struct AckCounter(Arc<AtomicUsize>);

    impl AckCounter {
        fn bump(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn get(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct QueueRecord {
        published: Vec<Vec<u8>>,
        sender: Option<mpsc::UnboundedSender<Delivery>>,
    }

    /// Default local implementation of [`Bus`] used for tests and local runs.
    ///
    /// Each queue is single-subscriber: `subscribe` replaces any previous
    /// sender, mirroring the "single-writer" policy in spec §5. Publishing to
    /// a queue both records the payload (so tests can assert outbound order)
    /// and, if a subscriber is attached, forwards a [`Delivery`].
    #[derive(Default)]
    pub struct InMemoryBus {
        queues: parking_lot::Mutex<HashMap<String, QueueRecord>>,
        acks: AckCounter,
    }

    impl InMemoryBus {
        pub fn new() -> Self {
            Self::default()
        }

        /// Test helper: everything published to `queue`, in publish order.
        pub fn published(&self, queue: &str) -> Vec<Vec<u8>> {
            self.queues.lock().get(queue).map(|q| q.published.clone()).unwrap_or_default()
        }

        /// Test helper: total number of deliveries acked across all queues.
        pub fn ack_count(&self) -> usize {
            self.acks.get()
        }
    }

    #[async_trait]
    impl Bus for InMemoryBus {
        async fn publish(&self, queue: &str, payload: Vec<u8>) -> Result<(), BusError> {
            let mut queues = self.queues.lock();
            let record = queues.entry(queue.to_string()).or_default();
            record.published.push(payload.clone());
            if let Some(sender) = &record.sender {
                let acks = self.acks.clone();
                let delivery = Delivery::new(payload, false, move || acks.bump());
                // Subscriber may have dropped its receiver; that's fine, the
                // payload is still recorded above for outbound assertions.
                let _ = sender.send(delivery);
            }
            Ok(())
        }

        async fn subscribe(&self, queue: &str) -> Result<Box<dyn Subscription>, BusError> {
            let (tx, rx) = mpsc::unbounded_channel();
            let mut queues = self.queues.lock();
            queues.entry(queue.to_string()).or_default().sender = Some(tx);
            Ok(Box::new(InMemorySubscription { rx, cancelled: false }))
        }
    }

    struct InMemorySubscription {
        rx: mpsc::UnboundedReceiver<Delivery>,
        cancelled: bool,
    }

    #[async_trait]
    impl Subscription for InMemorySubscription {
        async fn recv(&mut self) -> Option<Delivery> {
            if self.cancelled {
                return None;
            }
            self.rx.recv().await
        }

        fn unsubscribe(&mut self) {
            self.cancelled = true;
            self.rx.close();
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
