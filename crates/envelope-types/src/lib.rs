//! # Envelope Types Crate
//!
//! The message model and the envelope classifier for a request/reply RPC
//! protocol carried over an unordered, at-most-once messaging channel.
//!
//! ## Design Principles
//!
//! - **Plain Data**: Envelopes are immutable, field-encoded values with no
//!   behavior beyond construction helpers.
//! - **Shallow Classification**: The classifier checks only `type` and
//!   `counter`; deeper validation belongs to the consuming layer.
//! - **Correlation vs. Sequencing**: `(serviceID, id)` links a reply to its
//!   call; `counter` exists only to rebuild delivery order.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod classifier;
pub mod errors;
pub mod message;

pub use classifier::{
    classify, inspect, is_protocol_message, Classified, RawEnvelope, RejectReason, Unrecognized,
};
pub use errors::EnvelopeError;
pub use message::{
    codes, CorrelationId, Message, MessageKind, MethodCall, Reply, RpcError, Sequenced,
};
