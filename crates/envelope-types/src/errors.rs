//! # Error Types
//!
//! Errors raised by the consuming layer when it goes past the classifier's
//! shallow check. The classifier itself never errors.

use crate::classifier::RejectReason;
use crate::message::MessageKind;
use thiserror::Error;

/// Errors from encoding or deeply decoding an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// The value is not a protocol envelope at all.
    #[error("Not a protocol envelope: {0}")]
    Unrecognized(RejectReason),

    /// The value passed classification but its fields do not match the
    /// message model.
    #[error("Malformed {kind} envelope: {reason}")]
    Malformed { kind: MessageKind, reason: String },

    /// A message could not be encoded as plain data.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<RejectReason> for EnvelopeError {
    fn from(reason: RejectReason) -> Self {
        EnvelopeError::Unrecognized(reason)
    }
}
