//! # Envelope Transport Crate
//!
//! Transport ports for the envelope protocol, their reference bindings to an
//! ambient message channel, and the send/receive pipelines built on them.
//!
//! ## Architecture
//!
//! ```text
//! EnvelopeSender ──► OutboundPort ──► AmbientChannel ──► InboundPort ──► EnvelopeReceiver
//!  (ids, counters)    (send)          (post_message)     (subscribe)      (classify, order,
//!                                                                          filter, deliver)
//! ```
//!
//! Ports are passed explicitly to the components that need them. Nothing
//! here holds process-wide transport state.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod channel;
pub mod config;
pub mod metrics;
pub mod ports;
pub mod receiver;
pub mod reorder;
pub mod sender;
pub mod sequencer;
pub mod stream;
pub mod subscription;

/// Target used when a send names no destination discriminator.
pub const WILDCARD_TARGET: &str = "*";

/// Envelopes a counter-ordered receiver holds behind a gap by default.
pub const DEFAULT_MAX_PENDING: usize = 1024;

pub use adapters::{AmbientInbound, AmbientOutbound};
pub use channel::{AmbientChannel, ListenerId, MessageContext, MessageEvent};
pub use config::{ConfigError, DeliveryOrder, ReceiverConfig, SenderConfig};
pub use metrics::{ReceiverMetrics, ReceiverMetricsSnapshot};
pub use ports::{Callback, InboundPort, OriginCallback, OutboundPort};
pub use receiver::{EnvelopeHandler, EnvelopeReceiver};
pub use reorder::{Push, ReorderBuffer};
pub use sender::{EnvelopeSender, SendError};
pub use sequencer::Sequencer;
pub use stream::EnvelopeStream;
pub use subscription::{Subscription, SubscriptionGate, SubscriptionState};

pub use envelope_types;
