//! # Reorder Buffer
//!
//! Rebuilds a sender's counter order on top of a channel that guarantees
//! none.
//!
//! ## Rules
//!
//! - Items are released in contiguous counter order from `next_expected`.
//! - A counter below `next_expected`, or one already pending, is stale.
//! - When more than `max_pending` items wait behind a gap, the gap is
//!   treated as lost and delivery resumes at the lowest pending counter.

use std::collections::BTreeMap;
use tracing::warn;

/// Outcome of [`ReorderBuffer::push`].
#[derive(Debug, PartialEq)]
pub enum Push<T> {
    /// These items are now deliverable, in counter order.
    Released(Vec<T>),
    /// Held until the gap before it closes.
    Buffered,
    /// Already delivered or already pending; handed back.
    Stale(T),
}

/// Counter-ordered buffer for one sender's stream.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    next_expected: u64,
    pending: BTreeMap<u64, T>,
    max_pending: usize,
    gaps_skipped: u64,
    /// `u64::MAX` has been released; every later counter is stale.
    exhausted: bool,
}

impl<T> ReorderBuffer<T> {
    /// Expect `initial` first; hold at most `max_pending` items.
    #[must_use]
    pub fn new(initial: u64, max_pending: usize) -> Self {
        Self {
            next_expected: initial,
            pending: BTreeMap::new(),
            max_pending,
            gaps_skipped: 0,
            exhausted: false,
        }
    }

    pub fn push(&mut self, counter: u64, item: T) -> Push<T> {
        if self.exhausted || counter < self.next_expected || self.pending.contains_key(&counter)
        {
            return Push::Stale(item);
        }

        if counter == self.next_expected {
            self.advance_past(counter);
            let mut ready = vec![item];
            ready.extend(self.drain_ready());
            return Push::Released(ready);
        }

        self.pending.insert(counter, item);
        if self.pending.len() <= self.max_pending {
            return Push::Buffered;
        }

        if let Some(&lowest) = self.pending.keys().next() {
            warn!(
                expected = self.next_expected,
                resumed_at = lowest,
                pending = self.pending.len(),
                "Reorder window exceeded, skipping gap"
            );
            self.skip(lowest.saturating_sub(self.next_expected));
            self.next_expected = lowest;
        }
        Push::Released(self.drain_ready())
    }

    /// Release everything pending in counter order, skipping any gaps.
    pub fn flush(&mut self) -> Vec<T> {
        let pending = std::mem::take(&mut self.pending);
        if let Some(&last) = pending.keys().next_back() {
            // Every pending counter is above next_expected.
            let span = last.saturating_sub(self.next_expected).saturating_add(1);
            self.skip(span.saturating_sub(pending.len() as u64));
            self.advance_past(last);
        }
        pending.into_values().collect()
    }

    #[must_use]
    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Counters given up on after the window overflowed or a flush.
    #[must_use]
    pub fn gaps_skipped(&self) -> u64 {
        self.gaps_skipped
    }

    fn advance_past(&mut self, counter: u64) {
        match counter.checked_add(1) {
            Some(next) => self.next_expected = next,
            None => {
                self.next_expected = u64::MAX;
                self.exhausted = true;
            }
        }
    }

    fn skip(&mut self, counters: u64) {
        self.gaps_skipped = self.gaps_skipped.saturating_add(counters);
    }

    fn drain_ready(&mut self) -> Vec<T> {
        let mut ready = Vec::new();
        while !self.exhausted {
            let Some(item) = self.pending.remove(&self.next_expected) else {
                break;
            };
            ready.push(item);
            self.advance_past(self.next_expected);
        }
        ready
    }
}
