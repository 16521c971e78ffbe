//! # Envelope Sender
//!
//! Frames messages for an outbound port: assigns call ids, stamps sequence
//! counters and echoes correlation ids on replies.
//!
//! A payload is encoded before its counter is taken, so an encoding
//! failure never leaves a hole in the counter sequence.

use crate::config::{ConfigError, SenderConfig};
use crate::ports::OutboundPort;
use crate::sequencer::Sequencer;
use envelope_types::{CorrelationId, EnvelopeError, Message, MethodCall, Reply, RpcError};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, trace};

/// Errors from framing a message.
#[derive(Debug, Error)]
pub enum SendError {
    /// The message could not be encoded as plain data.
    #[error("Failed to encode envelope: {0}")]
    Encode(#[from] EnvelopeError),
}

/// Sender bound to one outbound port.
pub struct EnvelopeSender<P> {
    port: P,
    target: Option<String>,
    counters: Sequencer,
    call_ids: Sequencer,
    messages_sent: AtomicU64,
}

impl<P: OutboundPort> EnvelopeSender<P> {
    /// Create a sender.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `config` does not validate.
    pub fn new(port: P, config: SenderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            port,
            target: config.target,
            counters: Sequencer::starting_at(config.initial_counter),
            call_ids: Sequencer::starting_at(config.initial_call_id),
            messages_sent: AtomicU64::new(0),
        })
    }

    /// Sender with the default configuration.
    pub fn with_defaults(port: P) -> Self {
        Self {
            port,
            target: None,
            counters: Sequencer::new(),
            call_ids: Sequencer::new(),
            messages_sent: AtomicU64::new(0),
        }
    }

    /// Invoke `method` on `service_id`, expecting a reply.
    pub fn call<T: Serialize>(
        &self,
        service_id: &str,
        method: &str,
        params: T,
    ) -> Result<CorrelationId, SendError> {
        let call = MethodCall::new(service_id, self.call_ids.next(), method, params);
        let correlation = call.correlation();
        self.send_message(Message::Method(call))?;
        Ok(correlation)
    }

    /// Invoke `method` fire-and-forget (`discard: true`).
    pub fn notify<T: Serialize>(
        &self,
        service_id: &str,
        method: &str,
        params: T,
    ) -> Result<CorrelationId, SendError> {
        let call = MethodCall::new(service_id, self.call_ids.next(), method, params).discarding();
        let correlation = call.correlation();
        self.send_message(Message::Method(call))?;
        Ok(correlation)
    }

    /// Answer `call` with `result`.
    ///
    /// Returns the counter used, or `None` when the caller asked for no
    /// reply.
    pub fn reply<A, T: Serialize>(
        &self,
        call: &MethodCall<A>,
        result: T,
    ) -> Result<Option<u64>, SendError> {
        if call.is_discard() {
            debug!(service = %call.service_id, id = call.id, "Skipping reply to discarded call");
            return Ok(None);
        }
        self.send_message(Message::Reply(Reply::success(call, result)))
            .map(Some)
    }

    /// Answer `call` with an application error.
    pub fn reply_error<A>(
        &self,
        call: &MethodCall<A>,
        error: RpcError,
    ) -> Result<Option<u64>, SendError> {
        if call.is_discard() {
            debug!(
                service = %call.service_id,
                id = call.id,
                code = error.code,
                "Skipping error reply to discarded call"
            );
            return Ok(None);
        }
        let reply: Reply<Value> = Reply::failure(call, error);
        self.send_message(Message::Reply(reply)).map(Some)
    }

    /// Stamp the next counter on `message` and send it.
    ///
    /// Returns the counter used.
    pub fn send_message<T: Serialize>(&self, message: Message<T>) -> Result<u64, SendError> {
        let plain = message.into_plain()?;
        let kind = plain.kind();
        let id = plain.id();

        let counter = self.counters.next();
        let value = plain.sequenced(counter).to_value()?;
        self.port.send(value, self.target.as_deref());
        self.messages_sent.fetch_add(1, Ordering::Relaxed);

        trace!(%kind, id, counter, "Envelope sent");
        Ok(counter)
    }

    /// Total envelopes handed to the port.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// The counter the next envelope will carry.
    #[must_use]
    pub fn next_counter(&self) -> u64 {
        self.counters.peek()
    }

    #[must_use]
    pub fn port(&self) -> &P {
        &self.port
    }
}
