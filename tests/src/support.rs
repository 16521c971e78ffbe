//! Shared fixtures for the integration scenarios.

use envelope_transport::{AmbientChannel, OutboundPort, WILDCARD_TARGET};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Outbound port that holds every send until told to release them, then
/// posts them to a channel in a caller-chosen order.
pub struct ScramblingPort {
    destination: AmbientChannel,
    origin: String,
    held: Mutex<Vec<Value>>,
}

impl ScramblingPort {
    pub fn new(destination: &AmbientChannel) -> Self {
        Self::from_origin(destination, "scrambler")
    }

    /// Post as `origin`, so receivers can tell this sender apart.
    pub fn from_origin(destination: &AmbientChannel, origin: &str) -> Self {
        Self {
            destination: destination.clone(),
            origin: origin.to_string(),
            held: Mutex::new(Vec::new()),
        }
    }

    pub fn held(&self) -> usize {
        self.held.lock().len()
    }

    /// Post held values, `order[i]` being the index of the i-th to post.
    /// Indices not named are lost.
    pub fn release(&self, order: &[usize]) {
        let held = std::mem::take(&mut *self.held.lock());
        for &index in order {
            self.destination
                .post_message(held[index].clone(), WILDCARD_TARGET, &self.origin);
        }
    }

    /// Post held values newest first.
    pub fn release_reversed(&self) {
        let count = self.held();
        let order: Vec<usize> = (0..count).rev().collect();
        self.release(&order);
    }
}

impl OutboundPort for ScramblingPort {
    fn send(&self, data: Value, _target: Option<&str>) {
        self.held.lock().push(data);
    }
}
