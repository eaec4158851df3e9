// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn def() -> SequenceFlowDefinition {
    SequenceFlowDefinition {
        id: "to-task".to_string(),
        parent_id: "main".to_string(),
        source_ref: "start".to_string(),
        target_ref: "task".to_string(),
        condition: None,
        is_default: false,
    }
}

#[test]
fn take_counts_and_delivers() {
    let mut flow = SequenceFlow::new(def());
    let outcome = flow.apply(&FlowAction::take("to-task", "task"));

    assert_eq!(outcome.routing_key, "flow.take");
    assert!(outcome.deliver.is_some());
    assert_eq!(flow.counters.take, 1);
}

#[test]
fn discard_counts_and_delivers() {
    let mut flow = SequenceFlow::new(def());
    let mut action = FlowAction::discard("to-task", "task");
    action.discard_sequence = vec!["start".to_string()];

    let outcome = flow.apply(&action);
    assert_eq!(outcome.routing_key, "flow.discard");
    assert!(outcome.deliver.is_some());
    assert_eq!(outcome.content.discard_sequence, vec!["start"]);
    assert_eq!(flow.counters.discard, 1);
}

#[test]
fn discard_chain_revisiting_target_loops() {
    let mut flow = SequenceFlow::new(def());
    let mut action = FlowAction::discard("to-task", "task");
    // the chain already discarded our target
    action.discard_sequence = vec!["start".to_string(), "task".to_string()];

    let outcome = flow.apply(&action);
    assert_eq!(outcome.routing_key, "flow.looped");
    assert!(outcome.deliver.is_none());
    assert_eq!(flow.counters.looped, 1);
    assert_eq!(flow.counters.discard, 0);
}

#[test]
fn counters_survive_state_round_trip() {
    let mut flow = SequenceFlow::new(def());
    flow.apply(&FlowAction::take("to-task", "task"));
    let state = flow.state();

    let mut recovered = SequenceFlow::new(def());
    recovered.recover(&state);
    assert_eq!(recovered.counters.take, 1);
}
