//! Monotonic sequence source for call ids and envelope counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing values.
#[derive(Debug, Default)]
pub struct Sequencer {
    next: AtomicU64,
}

impl Sequencer {
    /// Start at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    #[must_use]
    pub fn starting_at(initial: u64) -> Self {
        Self {
            next: AtomicU64::new(initial),
        }
    }

    /// Take the next value.
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    /// The value the next call to [`Sequencer::next`] will return.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
