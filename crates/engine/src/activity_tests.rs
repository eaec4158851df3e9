// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use std::sync::Arc;
use weir_core::{Environment, FlowAction, Graph, GraphBuilder, SequentialIdGen};

fn no_extensions() -> Extensions {
    Arc::new(Vec::new())
}

fn environment() -> Environment {
    Environment::new().with_ids(Arc::new(SequentialIdGen::default()))
}

fn activity(graph: &Graph, id: &str) -> Activity {
    let def = graph.activity_by_id(id).expect("element").clone();
    Activity::new(def, environment(), no_extensions(), graph)
}

fn keys(events: &[(String, Content)]) -> Vec<&str> {
    events.iter().map(|(k, _)| k.as_str()).collect()
}

fn linear() -> Graph {
    GraphBuilder::new()
        .process("main", true)
        .task("work")
        .end_event("end")
        .flow("f1", "work", "end")
        .build()
}

#[test]
fn run_walks_the_full_lifecycle() {
    let graph = linear();
    let mut work = activity(&graph, "work");
    work.run(Content::default());
    let events = work.drain(&graph).unwrap();
    assert_eq!(
        keys(&events),
        vec![
            "activity.enter",
            "activity.start",
            "activity.end",
            "activity.leave"
        ]
    );
    assert_eq!(work.counters, ActivityCounters { taken: 1, discarded: 0 });
    assert_eq!(work.status(), Status::Undefined);

    let leave = &events[3].1;
    let outbound = leave.outbound.as_ref().expect("outbound evaluated");
    assert_eq!(outbound.len(), 1);
    assert!(outbound[0].is_take());
    assert_eq!(outbound[0].target_id.as_deref(), Some("end"));
}

#[test]
fn discard_run_counts_and_discards_outbound() {
    let graph = linear();
    let mut work = activity(&graph, "work");
    work.inbound_flow(FlowAction::discard("up", "work"));
    let events = work.drain(&graph).unwrap();
    assert_eq!(keys(&events), vec!["activity.discarded", "activity.leave"]);
    assert_eq!(work.counters, ActivityCounters { taken: 0, discarded: 1 });
    let leave = &events[1].1;
    let outbound = leave.outbound.as_ref().expect("outbound discarded");
    assert!(!outbound[0].is_take());
}

#[test]
fn inbound_while_running_is_ignored() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .user_task("hold")
        .end_event("end")
        .flow("f1", "hold", "end")
        .build();
    let mut hold = activity(&graph, "hold");
    hold.inbound_flow(FlowAction::take("up", "hold"));
    let _ = hold.drain(&graph).unwrap();
    assert!(hold.is_waiting());

    hold.inbound_flow(FlowAction::take("up", "hold"));
    let events = hold.drain(&graph).unwrap();
    assert!(events.is_empty(), "second trigger must not restart the run");
}

fn join_graph() -> Graph {
    GraphBuilder::new()
        .process("main", true)
        .task("a")
        .task("b")
        .parallel_gateway("join")
        .end_event("end")
        .flow("f1", "a", "join")
        .flow("f2", "b", "join")
        .flow("f3", "join", "end")
        .build()
}

#[test]
fn parallel_join_converges_exactly_once() {
    let graph = join_graph();
    let mut join = activity(&graph, "join");

    join.inbound_flow(FlowAction::take("f1", "join"));
    assert!(join.drain(&graph).unwrap().is_empty(), "one of two touched");

    // A repeated touch from the same source must not converge the join.
    join.inbound_flow(FlowAction::take("f1", "join"));
    assert!(join.drain(&graph).unwrap().is_empty());

    join.inbound_flow(FlowAction::take("f2", "join"));
    let events = join.drain(&graph).unwrap();
    assert_eq!(events[0].0, "activity.enter");
    assert_eq!(join.counters.taken, 1);
    let enter = &events[0].1;
    assert_eq!(enter.inbound.len(), 2);
}

#[test]
fn join_with_only_discards_discards_downstream() {
    let graph = join_graph();
    let mut join = activity(&graph, "join");

    let mut first = FlowAction::discard("f1", "join");
    first.discard_sequence = vec!["x".to_string(), "y".to_string()];
    let mut second = FlowAction::discard("f2", "join");
    second.discard_sequence = vec!["y".to_string(), "z".to_string()];

    join.inbound_flow(first);
    join.inbound_flow(second);
    let events = join.drain(&graph).unwrap();
    assert_eq!(events[0].0, "activity.discarded");
    assert_eq!(join.counters, ActivityCounters { taken: 0, discarded: 1 });
    assert_eq!(events[0].1.discard_sequence, vec!["x", "y", "z"]);
}

#[test]
fn two_flows_from_one_source_are_a_single_touch() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .task("a")
        .task("b")
        .parallel_gateway("join")
        .end_event("end")
        .flow("f1", "a", "join")
        .flow("f2", "a", "join")
        .flow("f3", "b", "join")
        .flow("f4", "join", "end")
        .build();
    let mut join = activity(&graph, "join");

    join.inbound_flow(FlowAction::take("f1", "join"));
    join.inbound_flow(FlowAction::take("f2", "join"));
    assert!(join.drain(&graph).unwrap().is_empty(), "same source twice");

    join.inbound_flow(FlowAction::take("f3", "join"));
    let events = join.drain(&graph).unwrap();
    assert_eq!(events[0].0, "activity.enter");
    assert_eq!(join.counters.taken, 1);
}

#[test]
fn one_take_is_enough_for_the_join_to_take() {
    let graph = join_graph();
    let mut join = activity(&graph, "join");
    join.inbound_flow(FlowAction::discard("f1", "join"));
    join.inbound_flow(FlowAction::take("f2", "join"));
    let events = join.drain(&graph).unwrap();
    assert_eq!(events[0].0, "activity.enter");
    assert_eq!(join.counters.taken, 1);
}

#[test]
fn wait_signal_completes_the_run() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .user_task("approve")
        .end_event("end")
        .flow("f1", "approve", "end")
        .build();
    let mut approve = activity(&graph, "approve");
    approve.run(Content::default());
    let events = approve.drain(&graph).unwrap();
    assert_eq!(
        keys(&events),
        vec!["activity.enter", "activity.start", "activity.wait"]
    );
    assert!(approve.is_waiting());

    let accepted = approve.deliver_trigger(
        &ApiMessage::for_id("approve"),
        &CatchTrigger::Api,
        Some(json!({"ok": true})),
    );
    assert!(accepted);
    let events = approve.drain(&graph).unwrap();
    assert_eq!(keys(&events), vec!["activity.end", "activity.leave"]);
    assert_eq!(events[0].1.message, Some(json!({"ok": true})));
    assert_eq!(approve.counters.taken, 1);
}

#[test]
fn service_error_runs_the_discard_path() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .service_task("pay", "charge")
        .end_event("end")
        .flow("f1", "pay", "end")
        .build();
    let def = graph.activity_by_id("pay").expect("element").clone();
    let environment = environment().with_service("charge", |_: &serde_json::Value| {
        Err(weir_core::BpmnError::new("card declined", Some("E402".to_string())))
    });
    let mut pay = Activity::new(def, environment, no_extensions(), &graph);
    pay.run(Content::default());
    let events = pay.drain(&graph).unwrap();
    assert_eq!(
        keys(&events),
        vec![
            "activity.enter",
            "activity.start",
            "activity.error",
            "activity.discarded",
            "activity.leave"
        ]
    );
    assert_eq!(pay.counters, ActivityCounters { taken: 0, discarded: 1 });
    let error = events[2].1.error.as_ref().expect("error detail");
    assert_eq!(error.code(), Some("E402"));
}

#[test]
fn stop_snapshot_recover_resume_completes_without_double_counting() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .user_task("approve")
        .end_event("end")
        .flow("f1", "approve", "end")
        .build();
    let mut approve = activity(&graph, "approve");
    approve.run(Content::default());
    let _ = approve.drain(&graph).unwrap();
    assert!(approve.is_waiting());

    approve.stop();
    let state = approve.state();
    assert_eq!(state.status, Status::Executing);
    // The suspended run.execute must be in the snapshot as unacked work.
    let run_q = state
        .broker
        .queues
        .iter()
        .find(|q| q.name == "run-q")
        .expect("run-q captured");
    assert_eq!(run_q.messages.len(), 1);
    assert!(run_q.messages[0].redelivered());

    let def = graph.activity_by_id("approve").expect("element").clone();
    let mut recovered =
        Activity::recover(def, &state, environment(), no_extensions(), &graph);
    recovered.resume(&graph).unwrap();
    assert!(recovered.is_waiting(), "wait survives the round trip");

    assert!(recovered.deliver_trigger(
        &ApiMessage::for_id("approve"),
        &CatchTrigger::Api,
        None,
    ));
    let events = recovered.drain(&graph).unwrap();
    assert_eq!(keys(&events), vec!["activity.end", "activity.leave"]);
    assert_eq!(recovered.counters.taken, 1, "exactly one take for the run");
}

#[test]
fn api_discard_cancels_a_waiting_run() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .user_task("approve")
        .end_event("end")
        .flow("f1", "approve", "end")
        .build();
    let mut approve = activity(&graph, "approve");
    approve.run(Content::default());
    let _ = approve.drain(&graph).unwrap();

    approve.publish_command("discard");
    let events = approve.drain(&graph).unwrap();
    assert_eq!(keys(&events), vec!["activity.discarded", "activity.leave"]);
    assert_eq!(approve.counters, ActivityCounters { taken: 0, discarded: 1 });
}

mod union_properties {
    use super::*;
    use proptest::prelude::*;

    fn actions(
        sequences: Vec<Vec<String>>,
    ) -> Vec<FlowAction> {
        sequences
            .into_iter()
            .enumerate()
            .map(|(i, discard_sequence)| FlowAction {
                discard_sequence,
                ..FlowAction::discard(format!("f{i}"), "join")
            })
            .collect()
    }

    proptest! {
        #[test]
        fn union_has_no_duplicates(
            sequences in proptest::collection::vec(
                proptest::collection::vec("[a-e]", 0..6), 0..6)
        ) {
            let union = union_discard_sequences(&actions(sequences));
            let mut sorted = union.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), union.len());
        }

        #[test]
        fn union_covers_every_input_id(
            sequences in proptest::collection::vec(
                proptest::collection::vec("[a-e]", 0..6), 0..6)
        ) {
            let union = union_discard_sequences(&actions(sequences.clone()));
            for sequence in &sequences {
                for id in sequence {
                    prop_assert!(union.contains(id));
                }
            }
        }

        #[test]
        fn first_touch_wins_the_ordering(
            head in proptest::collection::vec("[a-e]", 1..6),
            tail in proptest::collection::vec("[a-e]", 0..6)
        ) {
            let union = union_discard_sequences(&actions(vec![head.clone(), tail]));
            let mut expected_prefix = Vec::new();
            for id in &head {
                if !expected_prefix.contains(id) {
                    expected_prefix.push(id.clone());
                }
            }
            prop_assert_eq!(&union[..expected_prefix.len()], &expected_prefix[..]);
        }
    }
}
