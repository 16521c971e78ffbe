//! Inbound Port (Driving Port)
//!
//! Delivers every raw incoming value to a callback. Classification is the
//! consumer's job; the port forwards foreign traffic too.

use crate::subscription::Subscription;
use serde_json::Value;
use std::sync::Arc;

/// Callback invoked once per incoming raw value.
pub type Callback = Arc<dyn Fn(Value) + Send + Sync>;

/// Callback that also receives the origin of the sending context, when the
/// transport can tell senders apart.
pub type OriginCallback = Arc<dyn Fn(Value, Option<&str>) + Send + Sync>;

/// Capability to subscribe to incoming values.
pub trait InboundPort: Send + Sync {
    /// Register `callback`. The returned handle is the only way to release
    /// the registration.
    ///
    /// Implementations MUST check the handle's gate before each invocation
    /// so that nothing fires after `detach()` returns.
    fn subscribe(&self, callback: Callback) -> Subscription;

    /// Like [`subscribe`](Self::subscribe), also passing the sender's
    /// origin. Transports that cannot identify senders pass `None`.
    fn subscribe_with_origin(&self, callback: OriginCallback) -> Subscription {
        self.subscribe(Arc::new(move |value: Value| callback(value, None)))
    }

    /// Convenience form taking a closure.
    fn subscribe_fn<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Value) + Send + Sync + 'static,
        Self: Sized,
    {
        self.subscribe(Arc::new(callback))
    }
}

impl<P: InboundPort + ?Sized> InboundPort for Arc<P> {
    fn subscribe(&self, callback: Callback) -> Subscription {
        (**self).subscribe(callback)
    }

    fn subscribe_with_origin(&self, callback: OriginCallback) -> Subscription {
        (**self).subscribe_with_origin(callback)
    }
}
