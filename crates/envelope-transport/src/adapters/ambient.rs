//! Reference bindings of the transport ports to an [`AmbientChannel`].
//!
//! - [`AmbientOutbound`] posts to the enclosing context with the wildcard
//!   target. No origin filtering is performed.
//! - [`AmbientInbound`] listens on a context's own channel and forwards the
//!   event payload, plus the poster's origin to origin-aware subscribers.

use crate::channel::{AmbientChannel, MessageContext};
use crate::ports::{Callback, InboundPort, OriginCallback, OutboundPort};
use crate::subscription::{Subscription, SubscriptionGate};
use crate::WILDCARD_TARGET;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace};

/// Default outbound binding.
#[derive(Debug, Clone)]
pub struct AmbientOutbound {
    destination: AmbientChannel,
    source_origin: String,
}

impl AmbientOutbound {
    /// Send from `context` to its parent.
    pub fn new(context: &MessageContext) -> Self {
        Self::towards(context, context.parent())
    }

    /// Send from `context` to an explicit destination channel, e.g. a
    /// parent addressing one of its children.
    pub fn towards(context: &MessageContext, destination: &AmbientChannel) -> Self {
        Self {
            destination: destination.clone(),
            source_origin: context.origin().to_string(),
        }
    }

    #[must_use]
    pub fn destination(&self) -> &AmbientChannel {
        &self.destination
    }
}

impl OutboundPort for AmbientOutbound {
    fn send(&self, data: Value, target: Option<&str>) {
        let target = target.unwrap_or(WILDCARD_TARGET);
        let receivers = self
            .destination
            .post_message(data, target, &self.source_origin);

        trace!(
            destination = self.destination.name(),
            target_origin = target,
            receivers,
            "Outbound send"
        );
    }
}

/// Default inbound binding.
#[derive(Debug, Clone)]
pub struct AmbientInbound {
    channel: AmbientChannel,
}

impl AmbientInbound {
    /// Receive on `context`'s own channel.
    pub fn new(context: &MessageContext) -> Self {
        Self::on(context.channel())
    }

    /// Receive on an explicit channel.
    pub fn on(channel: &AmbientChannel) -> Self {
        Self {
            channel: channel.clone(),
        }
    }
}

impl InboundPort for AmbientInbound {
    fn subscribe(&self, callback: Callback) -> Subscription {
        self.subscribe_with_origin(Arc::new(move |value: Value, _origin: Option<&str>| {
            callback(value)
        }))
    }

    fn subscribe_with_origin(&self, callback: OriginCallback) -> Subscription {
        let gate = SubscriptionGate::new();

        let listener_gate = gate.clone();
        let listener = self.channel.add_listener(move |event| {
            if listener_gate.is_open() {
                callback(event.data.clone(), Some(event.origin.as_str()));
            }
        });

        debug!(channel = self.channel.name(), listener, "Inbound subscription created");

        let channel = self.channel.clone();
        Subscription::new(gate, move || {
            channel.remove_listener(listener);
        })
    }
}
