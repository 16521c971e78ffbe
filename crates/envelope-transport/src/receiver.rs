//! # Envelope Receiver
//!
//! Receive-side pipeline on top of an inbound port.
//!
//! ```text
//! raw value ──► classify ──► order ──► service filter ──► handler
//!                  │           │             │
//!                  ▼           ▼             ▼
//!               dropped     buffered /    ignored
//!               (counted)   stale
//! ```
//!
//! Foreign traffic is dropped without error. Deeper validation stays with
//! the handler via [`RawEnvelope::decode`]. The pipeline performs no method
//! dispatch and no reply correlation.
//!
//! ## Counter Ordering
//!
//! Counters are only meaningful per sender, so an ordered receiver keeps one
//! [`ReorderBuffer`] per sender origin as reported by the port. A port that
//! cannot tell senders apart reports none, and all its traffic shares one
//! buffer. Released envelopes go through a single delivery queue drained by
//! one thread at a time, so the handler sees them in counter order even
//! when the channel invokes listeners concurrently.

use crate::config::{ConfigError, DeliveryOrder, ReceiverConfig};
use crate::metrics::{ReceiverMetrics, ReceiverMetricsSnapshot};
use crate::ports::InboundPort;
use crate::reorder::{Push, ReorderBuffer};
use crate::subscription::{Subscription, SubscriptionState};
use envelope_types::{classify, Classified, EnvelopeError, RawEnvelope, Unrecognized};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Consumer of envelopes that passed the pipeline.
pub trait EnvelopeHandler: Send + Sync + 'static {
    fn on_envelope(&self, envelope: RawEnvelope);

    /// An envelope the pipeline could not process, e.g. a counter that
    /// cannot be ordered.
    fn on_protocol_error(&self, error: EnvelopeError) {
        debug!(error = %error, "Unhandled protocol error");
    }
}

impl<F> EnvelopeHandler for F
where
    F: Fn(RawEnvelope) + Send + Sync + 'static,
{
    fn on_envelope(&self, envelope: RawEnvelope) {
        self(envelope);
    }
}

/// Per-sender reorder buffers and the queue of envelopes ready to deliver.
struct OrderState {
    initial: u64,
    max_pending: usize,
    senders: BTreeMap<Option<String>, ReorderBuffer<RawEnvelope>>,
    ready: VecDeque<RawEnvelope>,
    delivering: bool,
}

impl OrderState {
    fn new(initial: u64, max_pending: usize) -> Self {
        Self {
            initial,
            max_pending,
            senders: BTreeMap::new(),
            ready: VecDeque::new(),
            delivering: false,
        }
    }

    fn buffer_for(&mut self, origin: Option<&str>) -> &mut ReorderBuffer<RawEnvelope> {
        let (initial, max_pending) = (self.initial, self.max_pending);
        self.senders
            .entry(origin.map(str::to_string))
            .or_insert_with(|| {
                debug!(origin = origin.unwrap_or("<unknown>"), "Tracking new sender");
                ReorderBuffer::new(initial, max_pending)
            })
    }

    fn pending(&self) -> usize {
        self.senders.values().map(ReorderBuffer::pending_len).sum()
    }

    /// Claim the delivery queue. Returns `false` if another caller is
    /// already draining it; that caller will deliver what was queued.
    fn claim(&mut self) -> bool {
        if self.delivering {
            return false;
        }
        self.delivering = true;
        true
    }
}

struct Pipeline {
    service_id: Option<String>,
    warn_on_unsequenced: bool,
    order: Option<Mutex<OrderState>>,
    metrics: Arc<ReceiverMetrics>,
    handler: Box<dyn EnvelopeHandler>,
}

impl Pipeline {
    fn process(&self, value: Value, origin: Option<&str>) {
        ReceiverMetrics::incr(&self.metrics.received);

        let envelope = match classify(value) {
            Classified::Method(envelope) | Classified::Reply(envelope) => envelope,
            Classified::Unrecognized(foreign) => {
                self.drop_foreign(&foreign);
                return;
            }
        };

        let Some(order) = &self.order else {
            self.deliver(envelope);
            return;
        };

        let Some(counter) = envelope.counter_u64() else {
            ReceiverMetrics::incr(&self.metrics.protocol_errors);
            let error = EnvelopeError::Malformed {
                kind: envelope.kind(),
                reason: format!("counter {} cannot be ordered", envelope.counter()),
            };
            warn!(error = %error, "Envelope rejected by ordering");
            self.handler.on_protocol_error(error);
            return;
        };

        {
            let mut state = order.lock();
            match state.buffer_for(origin).push(counter, envelope) {
                Push::Released(ready) => state.ready.extend(ready),
                Push::Buffered => {
                    ReceiverMetrics::incr(&self.metrics.buffered);
                    trace!(
                        counter,
                        origin = origin.unwrap_or("<unknown>"),
                        "Envelope buffered behind gap"
                    );
                    return;
                }
                Push::Stale(envelope) => {
                    ReceiverMetrics::incr(&self.metrics.stale_dropped);
                    debug!(
                        counter,
                        origin = origin.unwrap_or("<unknown>"),
                        kind = %envelope.kind(),
                        "Dropping stale envelope"
                    );
                    return;
                }
            }
            if !state.claim() {
                return;
            }
        }
        self.drain(order);
    }

    /// Deliver queued envelopes until the queue is empty. The state lock is
    /// never held across the handler, so a handler may re-enter.
    fn drain(&self, order: &Mutex<OrderState>) {
        loop {
            let next = {
                let mut state = order.lock();
                match state.ready.pop_front() {
                    Some(envelope) => envelope,
                    None => {
                        state.delivering = false;
                        return;
                    }
                }
            };
            self.deliver(next);
        }
    }

    fn deliver(&self, envelope: RawEnvelope) {
        if let Some(wanted) = &self.service_id {
            if envelope.service_id() != Some(wanted.as_str()) {
                ReceiverMetrics::incr(&self.metrics.other_service);
                trace!(
                    wanted = %wanted,
                    service = envelope.service_id().unwrap_or("<none>"),
                    "Envelope for another service"
                );
                return;
            }
        }

        ReceiverMetrics::incr(&self.metrics.delivered);
        self.handler.on_envelope(envelope);
    }

    fn drop_foreign(&self, foreign: &Unrecognized) {
        if foreign.reason.is_unsequenced() {
            ReceiverMetrics::incr(&self.metrics.unsequenced_dropped);
            if self.warn_on_unsequenced {
                warn!(reason = %foreign.reason, "Dropping envelope without sequencing support");
            } else {
                debug!(reason = %foreign.reason, "Dropping envelope without sequencing support");
            }
        } else {
            ReceiverMetrics::incr(&self.metrics.foreign_dropped);
            trace!(reason = %foreign.reason, "Ignoring foreign message");
        }
    }

    fn flush(&self) {
        let Some(order) = &self.order else {
            return;
        };
        {
            let mut state = order.lock();
            let flushed: Vec<RawEnvelope> = state
                .senders
                .values_mut()
                .flat_map(ReorderBuffer::flush)
                .collect();
            state.ready.extend(flushed);
            if !state.claim() {
                return;
            }
        }
        self.drain(order);
    }

    fn pending(&self) -> usize {
        self.order.as_ref().map_or(0, |order| order.lock().pending())
    }
}

/// An attached receive pipeline.
///
/// Dropping it detaches the underlying subscription.
pub struct EnvelopeReceiver {
    subscription: Subscription,
    pipeline: Arc<Pipeline>,
}

impl EnvelopeReceiver {
    /// Subscribe to `port` and route accepted envelopes to `handler`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `config` does not validate.
    pub fn attach<H: EnvelopeHandler>(
        port: &dyn InboundPort,
        config: ReceiverConfig,
        handler: H,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let order = match config.order {
            DeliveryOrder::Arrival => None,
            DeliveryOrder::Counter {
                initial,
                max_pending,
            } => Some(Mutex::new(OrderState::new(initial, max_pending))),
        };

        let pipeline = Arc::new(Pipeline {
            service_id: config.service_id,
            warn_on_unsequenced: config.warn_on_unsequenced,
            order,
            metrics: Arc::new(ReceiverMetrics::new()),
            handler: Box::new(handler),
        });

        let listener = pipeline.clone();
        let subscription = port.subscribe_with_origin(Arc::new(
            move |value: Value, origin: Option<&str>| listener.process(value, origin),
        ));

        debug!(
            subscription = subscription.id(),
            service = pipeline.service_id.as_deref().unwrap_or("*"),
            ordered = pipeline.order.is_some(),
            "Envelope receiver attached"
        );

        Ok(Self {
            subscription,
            pipeline,
        })
    }

    #[must_use]
    pub fn metrics(&self) -> ReceiverMetricsSnapshot {
        self.pipeline.metrics.snapshot()
    }

    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        self.subscription.state()
    }

    /// Detach from the port. Idempotent.
    pub fn detach(&self) -> bool {
        self.subscription.detach()
    }

    /// Deliver every envelope held behind a gap, giving up on the gap.
    pub fn flush(&self) {
        self.pipeline.flush();
    }

    /// Envelopes currently held behind a gap, across all senders.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pipeline.pending()
    }
}
