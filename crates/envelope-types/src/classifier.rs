//! # Envelope Classifier
//!
//! Separates protocol envelopes from unrelated traffic sharing the same
//! ambient channel.
//!
//! ## Policy
//!
//! 1. The candidate must be a JSON object.
//! 2. `type` must be exactly `"method"` or `"reply"`.
//! 3. `counter` must be present and be a JSON number.
//!
//! Nothing else is inspected. `serviceID`, `id` and the payload fields are
//! validated by the consuming layer through [`RawEnvelope::decode`].
//!
//! A value whose `type` matches but which carries no counter comes from a
//! producer without sequencing support and is rejected like any other
//! foreign value.

use crate::errors::EnvelopeError;
use crate::message::{Message, MessageKind, Sequenced, COUNTER_FIELD, SERVICE_ID_FIELD, TYPE_FIELD};
use serde::de::DeserializeOwned;
use serde_json::{Number, Value};
use thiserror::Error;

/// Why a candidate was not accepted as a protocol envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum RejectReason {
    #[error("value is not an object")]
    NotAnObject,

    #[error("missing `type` field")]
    MissingType,

    #[error("`type` is neither \"method\" nor \"reply\"")]
    UnknownType,

    #[error("missing `counter` field")]
    MissingCounter,

    #[error("`counter` is not a number")]
    NonNumericCounter,
}

impl RejectReason {
    /// The `type` tag matched but sequencing is missing or unusable.
    ///
    /// Typically a legacy or foreign producer speaking a compatible-looking
    /// dialect.
    #[must_use]
    pub fn is_unsequenced(self) -> bool {
        matches!(
            self,
            RejectReason::MissingCounter | RejectReason::NonNumericCounter
        )
    }
}

/// A value proven to have envelope shape.
///
/// Only the classifier constructs this type, so holding one means `type`
/// and `counter` were checked.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEnvelope {
    kind: MessageKind,
    counter: Number,
    value: Value,
}

impl RawEnvelope {
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// The sender's sequence counter, as received.
    #[must_use]
    pub fn counter(&self) -> &Number {
        &self.counter
    }

    /// The counter as an unsigned integer, if it is one.
    #[must_use]
    pub fn counter_u64(&self) -> Option<u64> {
        self.counter.as_u64()
    }

    /// Shallow peek at `serviceID` for routing; not validated.
    #[must_use]
    pub fn service_id(&self) -> Option<&str> {
        self.value.get(SERVICE_ID_FIELD).and_then(Value::as_str)
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.value
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        self.value
    }

    /// Validate every field against the message model.
    ///
    /// # Errors
    ///
    /// Returns `EnvelopeError::Malformed` when a required field is missing
    /// or has the wrong shape for `T`.
    pub fn decode<T>(&self) -> Result<Sequenced<Message<T>>, EnvelopeError>
    where
        T: DeserializeOwned + Default,
    {
        serde_json::from_value(self.value.clone()).map_err(|e| EnvelopeError::Malformed {
            kind: self.kind,
            reason: e.to_string(),
        })
    }
}

impl TryFrom<Value> for RawEnvelope {
    type Error = Unrecognized;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match classify(value) {
            Classified::Method(envelope) | Classified::Reply(envelope) => Ok(envelope),
            Classified::Unrecognized(foreign) => Err(foreign),
        }
    }
}

/// A value the classifier refused, handed back untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Unrecognized {
    pub value: Value,
    pub reason: RejectReason,
}

impl From<Unrecognized> for EnvelopeError {
    fn from(foreign: Unrecognized) -> Self {
        EnvelopeError::Unrecognized(foreign.reason)
    }
}

/// Result of classifying one incoming value.
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Method(RawEnvelope),
    Reply(RawEnvelope),
    Unrecognized(Unrecognized),
}

impl Classified {
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        !matches!(self, Classified::Unrecognized(_))
    }

    /// The envelope, dropping foreign traffic.
    #[must_use]
    pub fn into_envelope(self) -> Option<RawEnvelope> {
        match self {
            Classified::Method(envelope) | Classified::Reply(envelope) => Some(envelope),
            Classified::Unrecognized(_) => None,
        }
    }
}

/// Run the shape check without taking ownership.
///
/// # Errors
///
/// Returns the first rule the candidate breaks.
pub fn inspect(candidate: &Value) -> Result<(MessageKind, &Number), RejectReason> {
    let Value::Object(fields) = candidate else {
        return Err(RejectReason::NotAnObject);
    };

    let kind = match fields.get(TYPE_FIELD) {
        None => return Err(RejectReason::MissingType),
        Some(Value::String(tag)) => {
            MessageKind::from_tag(tag).ok_or(RejectReason::UnknownType)?
        }
        Some(_) => return Err(RejectReason::UnknownType),
    };

    match fields.get(COUNTER_FIELD) {
        None => Err(RejectReason::MissingCounter),
        Some(Value::Number(counter)) => Ok((kind, counter)),
        Some(_) => Err(RejectReason::NonNumericCounter),
    }
}

/// Whether `candidate` is plausibly one of our envelopes.
#[must_use]
pub fn is_protocol_message(candidate: &Value) -> bool {
    inspect(candidate).is_ok()
}

/// Classify an incoming value into a tagged variant.
#[must_use]
pub fn classify(candidate: Value) -> Classified {
    let inspected = inspect(&candidate).map(|(kind, counter)| (kind, counter.clone()));

    match inspected {
        Ok((kind, counter)) => {
            let envelope = RawEnvelope {
                kind,
                counter,
                value: candidate,
            };
            match kind {
                MessageKind::Method => Classified::Method(envelope),
                MessageKind::Reply => Classified::Reply(envelope),
            }
        }
        Err(reason) => Classified::Unrecognized(Unrecognized {
            value: candidate,
            reason,
        }),
    }
}
