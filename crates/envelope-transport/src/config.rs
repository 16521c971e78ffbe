//! Sender and receiver configuration.

use crate::DEFAULT_MAX_PENDING;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An explicit destination discriminator was empty.
    #[error("Outbound target must not be empty; use None for the wildcard")]
    EmptyTarget,

    /// An explicit service filter was empty.
    #[error("Service filter must not be empty; use None to accept every service")]
    EmptyServiceId,

    /// Counter ordering was requested with no room to buffer.
    #[error("Reorder window must hold at least one envelope")]
    ZeroReorderWindow,
}

/// Sender-side configuration.
#[derive(Debug, Clone, Default)]
pub struct SenderConfig {
    /// Destination discriminator passed to the outbound port.
    /// `None` lets the port use its default.
    pub target: Option<String>,
    /// First sequence counter stamped on an envelope.
    pub initial_counter: u64,
    /// First call id handed out.
    pub initial_call_id: u64,
}

impl SenderConfig {
    /// Restrict sends to `target`.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target.as_deref() == Some("") {
            return Err(ConfigError::EmptyTarget);
        }
        Ok(())
    }
}

/// Order in which a receiver hands envelopes to its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryOrder {
    /// As they arrive.
    #[default]
    Arrival,
    /// Reconstructed from `counter`, separately for each sender origin the
    /// port reports. Delivery is serialized, so concurrent posts still reach
    /// the handler one at a time in counter order.
    Counter {
        /// Counter the sender starts at.
        initial: u64,
        /// Envelopes held behind a gap before it is given up on.
        max_pending: usize,
    },
}

/// Receiver-side configuration.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Only deliver envelopes whose `serviceID` matches.
    pub service_id: Option<String>,
    pub order: DeliveryOrder,
    /// Log type-matching envelopes without a counter at `warn`
    /// instead of `debug`.
    pub warn_on_unsequenced: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            service_id: None,
            order: DeliveryOrder::Arrival,
            warn_on_unsequenced: true,
        }
    }
}

impl ReceiverConfig {
    /// Accept only `service_id`.
    #[must_use]
    pub fn for_service(mut self, service_id: impl Into<String>) -> Self {
        self.service_id = Some(service_id.into());
        self
    }

    /// Reorder by counter, expecting the sender to start at zero.
    #[must_use]
    pub fn ordered(self) -> Self {
        self.with_order(DeliveryOrder::Counter {
            initial: 0,
            max_pending: DEFAULT_MAX_PENDING,
        })
    }

    #[must_use]
    pub fn with_order(mut self, order: DeliveryOrder) -> Self {
        self.order = order;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_id.as_deref() == Some("") {
            return Err(ConfigError::EmptyServiceId);
        }
        if let DeliveryOrder::Counter { max_pending: 0, .. } = self.order {
            return Err(ConfigError::ZeroReorderWindow);
        }
        Ok(())
    }
}
