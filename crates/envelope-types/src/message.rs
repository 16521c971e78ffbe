//! # Message Model
//!
//! The two envelope variants and the sequencing wrapper that rides on top
//! of them.
//!
//! ## Wire Shape
//!
//! ```text
//! { "type": "method", "serviceID": "calc", "id": 7, "method": "add",
//!   "params": [1, 2], "counter": 41 }
//!
//! { "type": "reply", "serviceID": "calc", "id": 7, "result": 3,
//!   "counter": 12 }
//! ```
//!
//! Encoding is structural (field-based) so a value survives any channel
//! that only carries plain serializable data.
//!
//! ## Invariants
//!
//! - `type` is exactly `"method"` or `"reply"`.
//! - `(serviceID, id)` identifies one outstanding call from a sender.
//! - `counter` is assigned by the sender, strictly increasing, and is never
//!   used for correlation.

use crate::errors::EnvelopeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Wire name of the discriminating tag field.
pub const TYPE_FIELD: &str = "type";

/// Wire name of the sequencing field.
pub const COUNTER_FIELD: &str = "counter";

/// Wire name of the service namespace field.
pub const SERVICE_ID_FIELD: &str = "serviceID";

/// Tag value carried by method calls.
pub const METHOD_TAG: &str = "method";

/// Tag value carried by replies.
pub const REPLY_TAG: &str = "reply";

/// Which of the two envelope variants a message is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// An RPC invocation.
    Method,
    /// The response to an earlier invocation.
    Reply,
}

impl MessageKind {
    /// The literal wire tag for this kind.
    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            MessageKind::Method => METHOD_TAG,
            MessageKind::Reply => REPLY_TAG,
        }
    }

    /// Parse a wire tag. Only the two exact literals are accepted.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            METHOD_TAG => Some(MessageKind::Method),
            REPLY_TAG => Some(MessageKind::Reply),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// The `(serviceID, id)` pair linking a reply to its call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationId {
    /// Logical service the call targeted.
    pub service_id: String,
    /// Caller-assigned call identifier.
    pub id: u64,
}

impl CorrelationId {
    /// Create a correlation id.
    pub fn new(service_id: impl Into<String>, id: u64) -> Self {
        Self {
            service_id: service_id.into(),
            id,
        }
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.service_id, self.id)
    }
}

/// Well-known application error codes (JSON-RPC 2.0 numbering).
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// Application-level failure carried inside a reply.
///
/// This is data, not a raised fault: the consuming RPC layer decides how to
/// surface it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("RPC error {code}: {message}")]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable description.
    pub message: String,
    /// Location of the failure inside a nested structure (e.g. a field path).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,
}

impl RpcError {
    /// Create an error without a path.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: None,
        }
    }

    /// Attach a field path.
    #[must_use]
    pub fn with_path<I, S>(mut self, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.path = Some(path.into_iter().map(Into::into).collect());
        self
    }

    /// The method named in a call is unknown to the receiver.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            codes::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        )
    }

    /// The call's params failed validation.
    pub fn invalid_params(details: impl Into<String>) -> Self {
        Self::new(
            codes::INVALID_PARAMS,
            format!("Invalid params: {}", details.into()),
        )
    }

    /// The receiver failed while handling the call.
    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(
            codes::INTERNAL_ERROR,
            format!("Internal error: {}", details.into()),
        )
    }
}

/// An RPC invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall<T> {
    /// Logical service / namespace the call targets.
    #[serde(rename = "serviceID")]
    pub service_id: String,

    /// Caller-assigned correlation identifier.
    pub id: u64,

    /// Operation being invoked.
    pub method: String,

    /// When `Some(true)`, the caller does not want a reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discard: Option<bool>,

    /// Arguments, opaque to the envelope layer.
    #[serde(default)]
    pub params: T,
}

impl<T> MethodCall<T> {
    /// Create a call that expects a reply.
    pub fn new(service_id: impl Into<String>, id: u64, method: impl Into<String>, params: T) -> Self {
        Self {
            service_id: service_id.into(),
            id,
            method: method.into(),
            discard: None,
            params,
        }
    }

    /// Mark the call fire-and-forget.
    #[must_use]
    pub fn discarding(mut self) -> Self {
        self.discard = Some(true);
        self
    }

    /// Whether the caller asked for no reply.
    #[must_use]
    pub fn is_discard(&self) -> bool {
        self.discard == Some(true)
    }

    /// The `(serviceID, id)` pair a reply must echo.
    #[must_use]
    pub fn correlation(&self) -> CorrelationId {
        CorrelationId::new(self.service_id.clone(), self.id)
    }
}

/// The response to a method call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply<T> {
    /// Echo of the call's service.
    #[serde(rename = "serviceID")]
    pub service_id: String,

    /// Echo of the call's id.
    pub id: u64,

    /// Success value; meaningless when `error` is set.
    #[serde(default)]
    pub result: T,

    /// Present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl<T> Reply<T> {
    /// Successful reply to `call`.
    pub fn success<P>(call: &MethodCall<P>, result: T) -> Self {
        Self {
            service_id: call.service_id.clone(),
            id: call.id,
            result,
            error: None,
        }
    }

    /// Failed reply to `call`. `result` is left at its default.
    pub fn failure<P>(call: &MethodCall<P>, error: RpcError) -> Self
    where
        T: Default,
    {
        Self {
            service_id: call.service_id.clone(),
            id: call.id,
            result: T::default(),
            error: Some(error),
        }
    }

    /// Whether this reply carries an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether this reply answers `call`.
    #[must_use]
    pub fn answers<P>(&self, call: &MethodCall<P>) -> bool {
        self.service_id == call.service_id && self.id == call.id
    }

    #[must_use]
    pub fn correlation(&self) -> CorrelationId {
        CorrelationId::new(self.service_id.clone(), self.id)
    }

    /// Collapse into the result or the carried error.
    pub fn into_result(self) -> Result<T, RpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result),
        }
    }
}

/// A protocol message: either a call or a reply, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
#[serde(bound(deserialize = "T: Deserialize<'de> + Default"))]
pub enum Message<T> {
    Method(MethodCall<T>),
    Reply(Reply<T>),
}

impl<T> Message<T> {
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Method(_) => MessageKind::Method,
            Message::Reply(_) => MessageKind::Reply,
        }
    }

    #[must_use]
    pub fn service_id(&self) -> &str {
        match self {
            Message::Method(call) => &call.service_id,
            Message::Reply(reply) => &reply.service_id,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        match self {
            Message::Method(call) => call.id,
            Message::Reply(reply) => reply.id,
        }
    }

    #[must_use]
    pub fn correlation(&self) -> CorrelationId {
        CorrelationId::new(self.service_id(), self.id())
    }

    /// Stamp a sequence counter onto the message.
    pub fn sequenced(self, counter: u64) -> Sequenced<Self> {
        Sequenced::new(self, counter)
    }
}

impl<T: Serialize> Message<T> {
    /// Encode the payload to plain data, keeping the envelope typed.
    ///
    /// # Errors
    ///
    /// Returns `EnvelopeError::Serialization` when the payload cannot be
    /// represented as plain data.
    pub fn into_plain(self) -> Result<Message<Value>, EnvelopeError> {
        fn plain<T: Serialize>(payload: T) -> Result<Value, EnvelopeError> {
            serde_json::to_value(payload).map_err(|e| EnvelopeError::Serialization(e.to_string()))
        }

        Ok(match self {
            Message::Method(call) => Message::Method(MethodCall {
                service_id: call.service_id,
                id: call.id,
                method: call.method,
                discard: call.discard,
                params: plain(call.params)?,
            }),
            Message::Reply(reply) => Message::Reply(Reply {
                service_id: reply.service_id,
                id: reply.id,
                result: plain(reply.result)?,
                error: reply.error,
            }),
        })
    }
}

impl<T> From<MethodCall<T>> for Message<T> {
    fn from(call: MethodCall<T>) -> Self {
        Message::Method(call)
    }
}

impl<T> From<Reply<T>> for Message<T> {
    fn from(reply: Reply<T>) -> Self {
        Message::Reply(reply)
    }
}

/// A message extended with the sender's sequence counter.
///
/// The counter only serves receive-side order reconstruction; it has no
/// relation to the correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequenced<M> {
    #[serde(flatten)]
    pub message: M,
    pub counter: u64,
}

impl<M> Sequenced<M> {
    pub fn new(message: M, counter: u64) -> Self {
        Self { message, counter }
    }

    pub fn into_inner(self) -> M {
        self.message
    }
}

impl<M: Serialize> Sequenced<M> {
    /// Encode into the plain value that travels over the channel.
    ///
    /// # Errors
    ///
    /// Returns `EnvelopeError::Serialization` when the payload cannot be
    /// represented as plain data (e.g. a map with non-string keys).
    pub fn to_value(&self) -> Result<Value, EnvelopeError> {
        serde_json::to_value(self).map_err(|e| EnvelopeError::Serialization(e.to_string()))
    }
}
