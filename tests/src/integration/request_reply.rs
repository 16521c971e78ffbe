//! # Request/Reply Round Trips
//!
//! A host context calls services running in a nested widget context:
//!
//! ```text
//! host ── EnvelopeSender ──► widget channel ──► EnvelopeReceiver(service) ──┐
//!  ▲                                                                        │
//!  └── EnvelopeStream ◄── host channel ◄── EnvelopeSender (replies) ◄───────┘
//! ```

#[cfg(test)]
mod tests {
    use crate::support::init_test_logging;
    use envelope_transport::{
        AmbientInbound, AmbientOutbound, EnvelopeReceiver, EnvelopeSender, EnvelopeStream,
        MessageContext, ReceiverConfig,
    };
    use envelope_types::{codes, Message, RawEnvelope, Reply, RpcError};
    use serde::{Deserialize, Serialize};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct AddArgs {
        a: i64,
        b: i64,
    }

    struct Topology {
        host: MessageContext,
        widget: MessageContext,
    }

    fn topology() -> Topology {
        init_test_logging();
        let host = MessageContext::top_level("https://host.example");
        let widget = MessageContext::child_of(&host, "https://widget.example");
        Topology { host, widget }
    }

    /// Calculator service living in the widget, replying to the host.
    fn calc_service(widget: &MessageContext) -> EnvelopeReceiver {
        let replies = Arc::new(EnvelopeSender::with_defaults(AmbientOutbound::new(widget)));
        let handler = move |envelope: RawEnvelope| {
            let Ok(sequenced) = envelope.decode::<Value>() else {
                return;
            };
            let Message::Method(call) = sequenced.message else {
                return;
            };
            let sent = match call.method.as_str() {
                "add" => match serde_json::from_value::<AddArgs>(call.params.clone()) {
                    Ok(args) => replies.reply(&call, args.a + args.b),
                    Err(e) => replies.reply_error(&call, RpcError::invalid_params(e.to_string())),
                },
                other => replies.reply_error(&call, RpcError::method_not_found(other)),
            };
            sent.unwrap();
        };
        EnvelopeReceiver::attach(
            &AmbientInbound::new(widget),
            ReceiverConfig::default().for_service("calc"),
            handler,
        )
        .unwrap()
    }

    /// Echo service sharing the widget channel with the calculator.
    fn echo_service(widget: &MessageContext) -> EnvelopeReceiver {
        let replies = Arc::new(EnvelopeSender::with_defaults(AmbientOutbound::new(widget)));
        let handler = move |envelope: RawEnvelope| {
            if let Ok(sequenced) = envelope.decode::<Value>() {
                if let Message::Method(call) = sequenced.message {
                    replies.reply(&call, call.params.clone()).unwrap();
                }
            }
        };
        EnvelopeReceiver::attach(
            &AmbientInbound::new(widget),
            ReceiverConfig::default().for_service("echo"),
            handler,
        )
        .unwrap()
    }

    fn host_sender(topology: &Topology) -> EnvelopeSender<AmbientOutbound> {
        EnvelopeSender::with_defaults(AmbientOutbound::towards(
            &topology.host,
            topology.widget.channel(),
        ))
    }

    fn host_replies(topology: &Topology) -> EnvelopeStream {
        EnvelopeStream::attach(&AmbientInbound::new(&topology.host), ReceiverConfig::default())
            .unwrap()
    }

    fn into_reply<T>(envelope: RawEnvelope) -> Reply<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        match envelope.decode::<T>().unwrap().into_inner() {
            Message::Reply(reply) => reply,
            Message::Method(call) => panic!("expected reply, got call {}", call.method),
        }
    }

    // =============================================================================
    // INTEGRATION TESTS
    // =============================================================================

    #[tokio::test]
    async fn test_call_reply_round_trip() {
        let topology = topology();
        let _service = calc_service(&topology.widget);
        let mut replies = host_replies(&topology);
        let sender = host_sender(&topology);

        let correlation = sender.call("calc", "add", AddArgs { a: 2, b: 3 }).unwrap();

        let envelope = timeout(Duration::from_secs(1), replies.recv())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let reply = into_reply::<i64>(envelope);
        assert_eq!(reply.correlation(), correlation);
        assert_eq!(reply.into_result(), Ok(5));
    }

    #[tokio::test]
    async fn test_unknown_method_gets_error_reply() {
        let topology = topology();
        let _service = calc_service(&topology.widget);
        let mut replies = host_replies(&topology);
        let sender = host_sender(&topology);

        sender.call("calc", "sqrt", json!([4])).unwrap();

        let reply = into_reply::<Value>(replies.try_recv().unwrap().unwrap());
        let error = reply.into_result().unwrap_err();
        assert_eq!(error.code, codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_params_get_invalid_params() {
        let topology = topology();
        let _service = calc_service(&topology.widget);
        let mut replies = host_replies(&topology);
        let sender = host_sender(&topology);

        sender.call("calc", "add", json!("two and three")).unwrap();

        let reply = into_reply::<Value>(replies.try_recv().unwrap().unwrap());
        assert!(reply.is_error());
        assert_eq!(reply.into_result().unwrap_err().code, codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_discarded_call_produces_no_reply() {
        let topology = topology();
        let service = calc_service(&topology.widget);
        let mut replies = host_replies(&topology);
        let sender = host_sender(&topology);

        sender.notify("calc", "add", AddArgs { a: 1, b: 1 }).unwrap();

        assert_eq!(service.metrics().delivered, 1);
        assert!(replies.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_services_multiplex_one_channel() {
        let topology = topology();
        let calc = calc_service(&topology.widget);
        let echo = echo_service(&topology.widget);
        let mut replies = host_replies(&topology);
        let sender = host_sender(&topology);

        let sum = sender.call("calc", "add", AddArgs { a: 20, b: 22 }).unwrap();
        let echoed = sender.call("echo", "say", json!("hello")).unwrap();

        let first = into_reply::<Value>(replies.try_recv().unwrap().unwrap());
        let second = into_reply::<Value>(replies.try_recv().unwrap().unwrap());
        assert_eq!(first.correlation(), sum);
        assert_eq!(first.into_result(), Ok(json!(42)));
        assert_eq!(second.correlation(), echoed);
        assert_eq!(second.into_result(), Ok(json!("hello")));

        assert_eq!(calc.metrics().other_service, 1);
        assert_eq!(echo.metrics().other_service, 1);
    }

    #[tokio::test]
    async fn test_reply_counters_follow_replying_sender() {
        let topology = topology();
        let _service = calc_service(&topology.widget);
        let mut replies = host_replies(&topology);
        let sender = host_sender(&topology);

        for n in 0..3 {
            sender.call("calc", "add", AddArgs { a: n, b: n }).unwrap();
        }

        let counters: Vec<_> = std::iter::from_fn(|| replies.try_recv())
            .map(|item| item.unwrap().counter_u64().unwrap())
            .collect();
        assert_eq!(counters, vec![0, 1, 2]);
    }
}
