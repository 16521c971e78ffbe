//! Ports Layer
//!
//! Transport-agnostic capabilities the protocol logic is written against:
//! - Outbound port: send one value to a destination
//! - Inbound port: subscribe to incoming values with a cancellable handle
//!
//! Concrete bindings live in `adapters/`. Tests substitute their own.

pub mod inbound;
pub mod outbound;

pub use inbound::{Callback, InboundPort, OriginCallback};
pub use outbound::OutboundPort;
