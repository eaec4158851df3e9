// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::message::Publish;
use crate::queue::QueueOptions;
use weir_core::Content;

fn run_broker() -> Broker {
    let mut broker = Broker::new();
    broker.assert_exchange("run", ExchangeType::Topic, true);
    broker.assert_queue("run-q", QueueOptions::default());
    broker.bind_queue("run-q", "run", "run.#", 0).unwrap();
    broker
}

#[test]
fn publish_routes_into_bound_queues() {
    let mut broker = run_broker();
    broker
        .publish("run", "run.enter", Content::for_element("task", "task"), Publish::default())
        .unwrap();
    broker
        .publish("run", "run.start", Content::for_element("task", "task"), Publish::default())
        .unwrap();

    assert_eq!(broker.queue("run-q").unwrap().len(), 2);
    assert!(broker.has_pending());
}

#[test]
fn publish_to_unknown_exchange_fails() {
    let mut broker = Broker::new();
    let err = broker
        .publish("run", "run.enter", Content::default(), Publish::default())
        .unwrap_err();
    assert_eq!(err, BrokerError::UnknownExchange("run".to_string()));
}

#[test]
fn next_delivers_in_order_and_tracks_acks() {
    let mut broker = run_broker();
    broker.consume("run-q", ConsumeOptions::tagged("owner")).unwrap();
    broker
        .publish("run", "run.enter", Content::default(), Publish::default())
        .unwrap();
    broker
        .publish("run", "run.start", Content::default(), Publish::default())
        .unwrap();

    let first = broker.next("run-q").unwrap();
    assert_eq!(first.message.routing_key(), "run.enter");
    assert_eq!(first.consumer_tag, "owner");
    broker.ack("run-q", first.delivery_tag);

    let second = broker.next("run-q").unwrap();
    assert_eq!(second.message.routing_key(), "run.start");
    // left unacked: still counted as in flight
    assert_eq!(broker.queue("run-q").unwrap().unacked_len(), 1);
    assert!(broker.next("run-q").is_none());
}

#[test]
fn no_consumer_means_no_delivery() {
    let mut broker = run_broker();
    broker
        .publish("run", "run.enter", Content::default(), Publish::default())
        .unwrap();
    assert!(broker.next("run-q").is_none());
    assert_eq!(broker.queue("run-q").unwrap().len(), 1);
}

#[test]
fn no_ack_consumer_settles_immediately() {
    let mut broker = run_broker();
    broker
        .consume("run-q", ConsumeOptions::tagged("owner").with_no_ack())
        .unwrap();
    broker
        .publish("run", "run.enter", Content::default(), Publish::default())
        .unwrap();

    let delivery = broker.next("run-q").unwrap();
    assert_eq!(delivery.delivery_tag, 0);
    assert_eq!(broker.queue("run-q").unwrap().unacked_len(), 0);
}

#[test]
fn mandatory_publish_without_consumer_errors() {
    let mut broker = Broker::new();
    broker.assert_exchange("event", ExchangeType::Topic, true);
    broker.assert_queue("listen-q", QueueOptions::default());
    broker
        .bind_queue("listen-q", "event", "activity.#", 0)
        .unwrap();

    // bound but consumerless: still undeliverable
    let err = broker
        .publish(
            "event",
            "activity.error",
            Content::default(),
            Publish::mandatory(),
        )
        .unwrap_err();
    assert!(matches!(err, BrokerError::Undeliverable { .. }));

    broker.consume("listen-q", ConsumeOptions::tagged("handler")).unwrap();
    broker
        .publish(
            "event",
            "activity.error",
            Content::default(),
            Publish::mandatory(),
        )
        .unwrap();
}

#[test]
fn cancel_drops_auto_delete_queues() {
    let mut broker = Broker::new();
    broker.assert_exchange("event", ExchangeType::Topic, true);
    broker.assert_queue("tmp-q", QueueOptions::transient());
    broker.bind_queue("tmp-q", "event", "#", 0).unwrap();
    broker.consume("tmp-q", ConsumeOptions::tagged("watcher")).unwrap();

    broker.cancel("watcher");
    assert!(broker.queue("tmp-q").is_none());
    assert!(broker.exchange("event").unwrap().bindings().is_empty());
}

#[test]
fn state_captures_pending_and_unacked_persistent_messages() {
    let mut broker = run_broker();
    broker.consume("run-q", ConsumeOptions::tagged("owner")).unwrap();
    broker
        .publish("run", "run.execute", Content::default(), Publish::persistent())
        .unwrap();
    broker
        .publish("run", "run.end", Content::default(), Publish::persistent())
        .unwrap();
    // transient messages are dropped from snapshots
    broker
        .publish("run", "run.noise", Content::default(), Publish::default())
        .unwrap();
    let in_flight = broker.next("run-q").unwrap();
    assert_eq!(in_flight.message.routing_key(), "run.execute");

    let state = broker.state();
    let queue = &state.queues[0];
    assert_eq!(queue.name, "run-q");
    let keys: Vec<_> = queue.messages.iter().map(|m| m.routing_key()).collect();
    assert_eq!(keys, vec!["run.execute", "run.end"]);
    assert!(queue.messages[0].redelivered());
    assert!(!queue.messages[1].redelivered());
}

#[test]
fn recover_replays_pending_work() {
    let mut broker = run_broker();
    broker.consume("run-q", ConsumeOptions::tagged("owner")).unwrap();
    broker
        .publish("run", "run.execute", Content::default(), Publish::persistent())
        .unwrap();
    broker.next("run-q").unwrap();
    let state = broker.state();

    let mut recovered = Broker::new();
    recovered.recover(&state);
    recovered
        .consume("run-q", ConsumeOptions::tagged("owner"))
        .unwrap();
    let delivery = recovered.next("run-q").unwrap();
    assert_eq!(delivery.message.routing_key(), "run.execute");
    assert!(delivery.message.redelivered());

    // bindings survive: a fresh publish still routes
    recovered
        .publish("run", "run.end", Content::default(), Publish::default())
        .unwrap();
    assert_eq!(recovered.queue("run-q").unwrap().len(), 1);
}

#[test]
fn snapshot_round_trips_through_json() {
    let mut broker = run_broker();
    broker
        .publish("run", "run.execute", Content::default(), Publish::persistent())
        .unwrap();
    let state = broker.state();
    let json = serde_json::to_string(&state).unwrap();
    let back: BrokerState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, state);
}
