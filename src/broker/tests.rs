use super::exchange::{Exchange, ExchangeKind, topic_matches};
use super::{Broker, BrokerError};

#[test]
fn test_exchange_new() {
    let exchange = Exchange::new("treestatus", ExchangeKind::Topic);
    assert_eq!(exchange.name, "treestatus");
    assert!(exchange.bindings.is_empty());
}

#[test]
fn test_exchange_bind_is_idempotent() {
    let mut exchange = Exchange::new("treestatus", ExchangeKind::Topic);
    exchange.bind("client1".to_string(), "tree.*");
    exchange.bind("client1".to_string(), "tree.*");
    assert_eq!(exchange.bindings.len(), 1);
}

#[test]
fn test_exchange_unbind_removes_all_patterns() {
    let mut exchange = Exchange::new("treestatus", ExchangeKind::Topic);
    exchange.bind("client1".to_string(), "tree.*");
    exchange.bind("client1".to_string(), "#");
    exchange.bind("client2".to_string(), "#");
    exchange.unbind(&"client1".to_string());
    assert_eq!(exchange.bindings.len(), 1);
    assert_eq!(exchange.bindings[0].subscriber, "client2");
}

#[test]
fn test_route_delivers_once_per_subscriber() {
    let mut exchange = Exchange::new("treestatus", ExchangeKind::Topic);
    exchange.bind("client1".to_string(), "tree.*");
    exchange.bind("client1".to_string(), "#");
    assert_eq!(exchange.route("tree.closed"), vec!["client1".to_string()]);
}

#[test]
fn test_direct_exchange_matches_exactly() {
    let mut exchange = Exchange::new("direct", ExchangeKind::Direct);
    exchange.bind("client1".to_string(), "tree.*");
    assert!(exchange.route("tree.closed").is_empty());
    assert_eq!(exchange.route("tree.*").len(), 1);
}

#[test]
fn test_topic_matching() {
    assert!(topic_matches("tree.closed", "tree.closed"));
    assert!(!topic_matches("tree.closed", "tree.opened"));
    assert!(topic_matches("tree.*", "tree.opened"));
    assert!(!topic_matches("tree.*", "tree.opened.again"));
    assert!(topic_matches("#", ""));
    assert!(topic_matches("#", "a.b.c"));
    assert!(topic_matches("tree.#", "tree"));
    assert!(topic_matches("tree.#", "tree.closed.now"));
    assert!(topic_matches("#.closed", "mozilla-central.closed"));
    assert!(topic_matches("*.#.closed", "autoland.x.y.closed"));
    assert!(!topic_matches("*.closed", "closed"));
}

#[test]
fn test_broker_new() {
    let broker = Broker::default();
    assert!(broker.is_online());
    assert_eq!(broker.subscriber_count(), 0);
    assert_eq!(broker.open_connections(), 0);
}

#[test]
fn test_broker_declare_exchange() {
    let mut broker = Broker::new();
    broker
        .declare_exchange("treestatus", ExchangeKind::Topic)
        .unwrap();
    broker
        .declare_exchange("treestatus", ExchangeKind::Topic)
        .unwrap();
    assert_eq!(
        broker.exchange("treestatus").map(|e| e.kind),
        Some(ExchangeKind::Topic)
    );

    let err = broker
        .declare_exchange("treestatus", ExchangeKind::Direct)
        .unwrap_err();
    assert!(matches!(err, BrokerError::KindMismatch { .. }));
    assert!(err.to_string().starts_with("PRECONDITION_FAILED"));
}

#[test]
fn test_broker_subscribe_and_unsubscribe() {
    let mut broker = Broker::default();
    let sub = broker.subscribe("treestatus", "tree.*");
    assert_eq!(broker.subscriber_count(), 1);
    let exchange = broker.exchange("treestatus").unwrap();
    assert_eq!(exchange.kind, ExchangeKind::Topic);
    assert_eq!(exchange.bindings[0].subscriber, sub.id);

    broker.unsubscribe("treestatus", &sub.id);
    assert!(broker.exchange("treestatus").unwrap().bindings.is_empty());

    // unknown exchange is ignored
    broker.unsubscribe("missing", &sub.id);
}

#[test]
fn test_broker_publish() {
    let mut broker = Broker::default();
    let mut closed = broker.subscribe("treestatus", "tree.closed");
    let mut all = broker.subscribe("treestatus", "#");

    let delivered = broker
        .publish("treestatus", "tree.closed", b"hello".to_vec())
        .unwrap();
    assert_eq!(delivered, 2);

    let received = closed.try_next().unwrap();
    assert_eq!(received.exchange, "treestatus");
    assert_eq!(received.routing_key, "tree.closed");
    assert_eq!(received.body, b"hello");
    assert!(all.try_next().is_some());

    let delivered = broker
        .publish("treestatus", "tree.opened", b"hello".to_vec())
        .unwrap();
    assert_eq!(delivered, 1);
    assert!(closed.try_next().is_none());
    assert!(all.try_next().is_some());
}

#[test]
fn test_broker_cleanup_subscriber() {
    let mut broker = Broker::default();
    let sub = broker.subscribe("treestatus", "#");
    broker.subscribe("other", "#");

    broker.cleanup_subscriber(&sub.id);
    assert_eq!(broker.subscriber_count(), 1);
    assert!(broker.exchange("treestatus").unwrap().bindings.is_empty());
}

#[test]
fn test_publish_to_nonexistent_exchange() {
    let mut broker = Broker::default();
    let err = broker
        .publish("nonexistent", "tree.closed", b"hello".to_vec())
        .unwrap_err();
    assert_eq!(err, BrokerError::ExchangeNotFound("nonexistent".to_string()));
}

#[test]
fn test_publish_to_subscriber_with_closed_channel() {
    let mut broker = Broker::default();
    let sub = broker.subscribe("treestatus", "#");
    let mut kept = broker.subscribe("treestatus", "tree.*");

    // Drop the receiver to close the channel
    drop(sub);

    let delivered = broker
        .publish("treestatus", "tree.closed", b"hello".to_vec())
        .unwrap();
    assert_eq!(delivered, 1);
    assert!(kept.try_next().is_some());

    // The dead subscriber and its binding are gone
    assert_eq!(broker.subscriber_count(), 1);
    let bindings = &broker.exchange("treestatus").unwrap().bindings;
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].subscriber, kept.id);

    let delivered = broker
        .publish("treestatus", "tree.closed", b"again".to_vec())
        .unwrap();
    assert_eq!(delivered, 1);
}

#[test]
fn test_connection_accounting() {
    let mut broker = Broker::new();
    let first = broker.open_connection("user", "pw").unwrap();
    let second = broker.open_connection("user", "pw").unwrap();
    assert_eq!(broker.open_connections(), 2);
    assert_eq!(broker.peak_connections(), 2);

    broker.close_connection(first);
    broker.close_connection(second);
    assert_eq!(broker.open_connections(), 0);
    assert_eq!(broker.peak_connections(), 2);
    assert_eq!(broker.connections_opened(), 2);
}

#[test]
fn test_restart_drops_connections_of_old_generation() {
    let mut broker = Broker::new();
    let old = broker.open_connection("user", "pw").unwrap();
    broker.restart();
    assert_eq!(broker.open_connections(), 0);
    assert_ne!(broker.generation(), old);

    let fresh = broker.open_connection("user", "pw").unwrap();
    broker.close_connection(old);
    assert_eq!(broker.open_connections(), 1);
    broker.close_connection(fresh);
    assert_eq!(broker.open_connections(), 0);
}

#[test]
fn test_offline_broker_refuses_connections_and_publishes() {
    let mut broker = Broker::new();
    broker.subscribe("treestatus", "#");
    broker.set_online(false);
    assert_eq!(
        broker.open_connection("user", "pw").unwrap_err(),
        BrokerError::Offline
    );
    assert_eq!(
        broker
            .publish("treestatus", "tree.closed", Vec::new())
            .unwrap_err(),
        BrokerError::Offline
    );

    broker.set_online(true);
    assert!(broker.open_connection("user", "pw").is_ok());
}

#[test]
fn test_credentials_are_checked() {
    let mut broker = Broker::new().with_credentials("treestatus", "secret");
    assert_eq!(
        broker.open_connection("treestatus", "wrong").unwrap_err(),
        BrokerError::AccessRefused("treestatus".to_string())
    );
    assert!(broker.open_connection("treestatus", "secret").is_ok());
}
