//! Receive-side counters.
//!
//! Foreign and unsequenced traffic is dropped silently at the protocol
//! level; these counters are where those drops become visible.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for one receiver.
#[derive(Debug, Default)]
pub struct ReceiverMetrics {
    /// Raw values seen by the subscription.
    pub received: AtomicU64,
    /// Envelopes handed to the handler.
    pub delivered: AtomicU64,
    /// Values that were not envelopes at all.
    pub foreign_dropped: AtomicU64,
    /// Type-matching values without a usable counter.
    pub unsequenced_dropped: AtomicU64,
    /// Envelopes for a different `serviceID`.
    pub other_service: AtomicU64,
    /// Envelopes whose counter was already delivered or pending.
    pub stale_dropped: AtomicU64,
    /// Envelopes parked behind a counter gap.
    pub buffered: AtomicU64,
    /// Envelopes reported to the handler as protocol errors.
    pub protocol_errors: AtomicU64,
}

impl ReceiverMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> ReceiverMetricsSnapshot {
        ReceiverMetricsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            foreign_dropped: self.foreign_dropped.load(Ordering::Relaxed),
            unsequenced_dropped: self.unsequenced_dropped.load(Ordering::Relaxed),
            other_service: self.other_service.load(Ordering::Relaxed),
            stale_dropped: self.stale_dropped.load(Ordering::Relaxed),
            buffered: self.buffered.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ReceiverMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverMetricsSnapshot {
    pub received: u64,
    pub delivered: u64,
    pub foreign_dropped: u64,
    pub unsequenced_dropped: u64,
    pub other_service: u64,
    pub stale_dropped: u64,
    pub buffered: u64,
    pub protocol_errors: u64,
}

impl ReceiverMetricsSnapshot {
    /// Everything received but never delivered.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.foreign_dropped + self.unsequenced_dropped + self.other_service + self.stale_dropped
    }
}
