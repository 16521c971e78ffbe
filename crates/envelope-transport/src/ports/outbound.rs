//! Outbound Port (Driven Port)
//!
//! Fire-and-forget delivery of a plain value.

use serde_json::Value;
use std::sync::Arc;

/// Capability to hand a value to the underlying channel.
///
/// There is no delivery confirmation and no error channel. A send the
/// channel fails to deliver is indistinguishable from silence.
pub trait OutboundPort: Send + Sync {
    /// Send `data`. `target` is a destination discriminator meaningful
    /// only to the concrete transport (e.g. an origin restriction); it is
    /// not required to be checked.
    fn send(&self, data: Value, target: Option<&str>);
}

impl<P: OutboundPort + ?Sized> OutboundPort for Arc<P> {
    fn send(&self, data: Value, target: Option<&str>) {
        (**self).send(data, target);
    }
}

impl<P: OutboundPort + ?Sized> OutboundPort for Box<P> {
    fn send(&self, data: Value, target: Option<&str>) {
        (**self).send(data, target);
    }
}
