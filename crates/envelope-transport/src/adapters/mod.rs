//! Adapters Layer
//!
//! Reference bindings of the ports to the ambient message channel.

pub mod ambient;

pub use ambient::{AmbientInbound, AmbientOutbound};
