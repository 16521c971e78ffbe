//! # Counter Reordering
//!
//! The channel promises no ordering. These scenarios hold every send in a
//! scrambling port and release it out of order, then check what an
//! arrival-ordered and a counter-ordered receiver hand to their handlers.

#[cfg(test)]
mod tests {
    use crate::support::{init_test_logging, ScramblingPort};
    use envelope_transport::{
        AmbientChannel, AmbientInbound, DeliveryOrder, EnvelopeReceiver, EnvelopeSender,
        ReceiverConfig, SenderConfig,
    };
    use envelope_types::RawEnvelope;
    use parking_lot::Mutex;
    use serde_json::Value;
    use std::sync::Arc;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn setup() -> (AmbientChannel, EnvelopeSender<ScramblingPort>) {
        init_test_logging();
        let channel = AmbientChannel::new("service");
        let sender = EnvelopeSender::with_defaults(ScramblingPort::new(&channel));
        (channel, sender)
    }

    fn attach(
        channel: &AmbientChannel,
        config: ReceiverConfig,
    ) -> (EnvelopeReceiver, Arc<Mutex<Vec<u64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let receiver = EnvelopeReceiver::attach(
            &AmbientInbound::on(channel),
            config,
            move |envelope: RawEnvelope| {
                if let Some(counter) = envelope.counter_u64() {
                    sink.lock().push(counter);
                }
            },
        )
        .unwrap();
        (receiver, seen)
    }

    fn send_calls(sender: &EnvelopeSender<ScramblingPort>, count: usize) {
        for _ in 0..count {
            sender.call("svc", "tick", Value::Null).unwrap();
        }
    }

    // =============================================================================
    // INTEGRATION TESTS
    // =============================================================================

    #[test]
    fn test_arrival_order_is_preserved_without_ordering() {
        let (channel, sender) = setup();
        let (_receiver, seen) = attach(&channel, ReceiverConfig::default());

        send_calls(&sender, 4);
        sender.port().release_reversed();

        assert_eq!(*seen.lock(), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_counter_order_restored() {
        let (channel, sender) = setup();
        let (receiver, seen) = attach(&channel, ReceiverConfig::default().ordered());

        send_calls(&sender, 6);
        sender.port().release(&[4, 1, 0, 5, 3, 2]);

        assert_eq!(*seen.lock(), vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(receiver.pending(), 0);
    }

    #[test]
    fn test_duplicates_delivered_once() {
        let (channel, sender) = setup();
        let (receiver, seen) = attach(&channel, ReceiverConfig::default().ordered());

        send_calls(&sender, 3);
        sender.port().release(&[0, 2, 1, 2, 0]);

        assert_eq!(*seen.lock(), vec![0, 1, 2]);
        assert_eq!(receiver.metrics().stale_dropped, 2);
    }

    #[test]
    fn test_lost_envelope_released_by_flush() {
        let (channel, sender) = setup();
        let (receiver, seen) = attach(&channel, ReceiverConfig::default().ordered());

        send_calls(&sender, 4);
        // Counter 1 never arrives.
        sender.port().release(&[0, 2, 3]);
        assert_eq!(*seen.lock(), vec![0]);
        assert_eq!(receiver.pending(), 2);

        receiver.flush();
        assert_eq!(*seen.lock(), vec![0, 2, 3]);
    }

    #[test]
    fn test_window_overflow_skips_gap() {
        let (channel, sender) = setup();
        let config = ReceiverConfig::default().with_order(DeliveryOrder::Counter {
            initial: 0,
            max_pending: 2,
        });
        let (receiver, seen) = attach(&channel, config);

        send_calls(&sender, 5);
        // Counter 0 is lost; the third pending envelope overflows the window.
        sender.port().release(&[1, 2, 3, 4]);

        assert_eq!(*seen.lock(), vec![1, 2, 3, 4]);
        assert_eq!(receiver.pending(), 0);
    }

    #[test]
    fn test_receiver_follows_sender_initial_counter() {
        init_test_logging();
        let channel = AmbientChannel::new("service");
        let config = SenderConfig {
            initial_counter: 500,
            ..SenderConfig::default()
        };
        let sender = EnvelopeSender::new(ScramblingPort::new(&channel), config).unwrap();
        let (_receiver, seen) = attach(
            &channel,
            ReceiverConfig::default().with_order(DeliveryOrder::Counter {
                initial: 500,
                max_pending: 16,
            }),
        );

        send_calls(&sender, 3);
        sender.port().release(&[2, 0, 1]);

        assert_eq!(*seen.lock(), vec![500, 501, 502]);
    }

    #[test]
    fn test_interleaved_senders_each_keep_their_order() {
        init_test_logging();
        let channel = AmbientChannel::new("service");
        let widget = EnvelopeSender::with_defaults(ScramblingPort::from_origin(
            &channel,
            "https://widget.example",
        ));
        let panel = EnvelopeSender::with_defaults(ScramblingPort::from_origin(
            &channel,
            "https://panel.example",
        ));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let receiver = EnvelopeReceiver::attach(
            &AmbientInbound::on(&channel),
            ReceiverConfig::default().ordered(),
            move |envelope: RawEnvelope| {
                let value = envelope.into_value();
                let service = value["serviceID"].as_str().unwrap_or_default().to_string();
                sink.lock().push((service, value["counter"].as_u64().unwrap_or_default()));
            },
        )
        .unwrap();

        for _ in 0..3 {
            widget.call("widget", "tick", Value::Null).unwrap();
            panel.call("panel", "tick", Value::Null).unwrap();
        }
        panel.port().release(&[2, 0, 1]);
        widget.port().release(&[1, 2, 0]);

        let per_sender = |name: &str| -> Vec<u64> {
            seen.lock()
                .iter()
                .filter(|(service, _)| service == name)
                .map(|(_, counter)| *counter)
                .collect()
        };
        assert_eq!(per_sender("widget"), vec![0, 1, 2]);
        assert_eq!(per_sender("panel"), vec![0, 1, 2]);
        assert_eq!(receiver.metrics().stale_dropped, 0);
        assert_eq!(receiver.pending(), 0);
    }
}
