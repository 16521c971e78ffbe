//! # Subscription Handle
//!
//! The cancellable resource returned by every inbound port.
//!
//! ```text
//!   subscribe() ──► Active ──detach()/drop──► Detached (terminal)
//! ```
//!
//! A port gates each callback invocation on the subscription's
//! [`SubscriptionGate`]. Once `detach()` returns, no new invocation starts;
//! one already running completes normally.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// The callback fires for incoming values.
    Active,
    /// Terminal. The callback never fires again.
    Detached,
}

/// Shared open/closed flag checked by a port before invoking a callback.
#[derive(Debug, Clone)]
pub struct SubscriptionGate {
    open: Arc<AtomicBool>,
}

impl SubscriptionGate {
    /// Create an open gate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Close the gate. Returns `true` only for the call that closed it.
    fn close(&self) -> bool {
        self.open.swap(false, Ordering::AcqRel)
    }
}

impl Default for SubscriptionGate {
    fn default() -> Self {
        Self::new()
    }
}

type Release = Box<dyn FnOnce() + Send>;

/// Handle to an inbound port registration.
///
/// Dropping the handle detaches it, so the registration is released on
/// every exit path of the owner.
pub struct Subscription {
    id: u64,
    gate: SubscriptionGate,
    release: Mutex<Option<Release>>,
}

impl Subscription {
    /// Create a handle around `gate`. `release` runs exactly once, on the
    /// first detach, to undo the port-side registration.
    pub fn new<F>(gate: SubscriptionGate, release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed),
            gate,
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// Process-unique identifier, for logs.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        if self.gate.is_open() {
            SubscriptionState::Active
        } else {
            SubscriptionState::Detached
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == SubscriptionState::Active
    }

    /// Move to `Detached`.
    ///
    /// Idempotent: returns `true` for the call that performed the
    /// transition and `false` for every later call.
    pub fn detach(&self) -> bool {
        if !self.gate.close() {
            return false;
        }

        let release = self.release.lock().take();
        if let Some(release) = release {
            release();
        }

        debug!(subscription = self.id, "Subscription detached");
        true
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
