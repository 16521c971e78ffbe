//! Async consumption of accepted envelopes.
//!
//! The port callback pushes into an unbounded channel, so a slow consumer
//! never blocks the sending side of the ambient channel.

use crate::config::{ConfigError, ReceiverConfig};
use crate::metrics::ReceiverMetricsSnapshot;
use crate::ports::InboundPort;
use crate::receiver::{EnvelopeHandler, EnvelopeReceiver};
use envelope_types::{EnvelopeError, RawEnvelope};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::trace;

type Item = Result<RawEnvelope, EnvelopeError>;

struct ForwardingHandler {
    tx: mpsc::UnboundedSender<Item>,
}

impl ForwardingHandler {
    fn forward(&self, item: Item) {
        if self.tx.send(item).is_err() {
            trace!("Envelope stream closed, dropping item");
        }
    }
}

impl EnvelopeHandler for ForwardingHandler {
    fn on_envelope(&self, envelope: RawEnvelope) {
        self.forward(Ok(envelope));
    }

    fn on_protocol_error(&self, error: EnvelopeError) {
        self.forward(Err(error));
    }
}

/// Stream of envelopes accepted by a receive pipeline.
///
/// Yields `Err` for envelopes the pipeline rejected as protocol errors.
/// Ends once [`close`](Self::close) is called and the backlog is drained.
pub struct EnvelopeStream {
    receiver: EnvelopeReceiver,
    rx: mpsc::UnboundedReceiver<Item>,
}

impl EnvelopeStream {
    /// Subscribe to `port` and buffer accepted envelopes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `config` does not validate.
    pub fn attach(port: &dyn InboundPort, config: ReceiverConfig) -> Result<Self, ConfigError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let receiver = EnvelopeReceiver::attach(port, config, ForwardingHandler { tx })?;
        Ok(Self { receiver, rx })
    }

    /// Next envelope, or `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<Item> {
        self.rx.recv().await
    }

    /// Next envelope if one is already buffered.
    pub fn try_recv(&mut self) -> Option<Item> {
        match self.rx.try_recv() {
            Ok(item) => Some(item),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Detach from the port. Buffered envelopes can still be received.
    pub fn close(&mut self) {
        self.receiver.detach();
        self.rx.close();
    }

    #[must_use]
    pub fn metrics(&self) -> ReceiverMetricsSnapshot {
        self.receiver.metrics()
    }

    #[must_use]
    pub fn receiver(&self) -> &EnvelopeReceiver {
        &self.receiver
    }
}

impl tokio_stream::Stream for EnvelopeStream {
    type Item = Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
