// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::collections::BTreeMap;
use weir_core::Environment;

fn flow(id: &str, condition: Option<&str>, is_default: bool) -> SequenceFlowDefinition {
    SequenceFlowDefinition {
        id: id.to_string(),
        parent_id: "main".to_string(),
        source_ref: "gw".to_string(),
        target_ref: format!("after-{id}"),
        condition: condition.map(str::to_string),
        is_default,
    }
}

fn env_with(name: &str, value: serde_json::Value) -> Environment {
    let mut vars = BTreeMap::new();
    vars.insert(name.to_string(), value);
    Environment::new().with_variables(vars)
}

fn kinds(actions: &[FlowAction]) -> Vec<(&str, FlowActionKind)> {
    actions.iter().map(|a| (a.id.as_str(), a.action)).collect()
}

#[test]
fn default_flow_is_pure_fallback() {
    let env = env_with("go", serde_json::json!(true));
    let flows = vec![
        flow("a", Some("${variables.missing}"), false),
        flow("b", Some("${variables.go}"), false),
        flow("dflt", None, true),
    ];
    let source = Content::for_element("gw", "exclusiveGateway");

    let actions = evaluate_outbound(&flows, &source, &env, false).unwrap();
    assert_eq!(
        kinds(&actions),
        vec![
            ("a", FlowActionKind::Discard),
            ("b", FlowActionKind::Take),
            ("dflt", FlowActionKind::Discard),
        ]
    );
}

#[test]
fn default_taken_when_nothing_else_matches() {
    let env = Environment::new();
    let flows = vec![
        flow("a", Some("${variables.missing}"), false),
        flow("dflt", None, true),
    ];
    let source = Content::for_element("gw", "exclusiveGateway");

    let actions = evaluate_outbound(&flows, &source, &env, false).unwrap();
    assert_eq!(
        kinds(&actions),
        vec![("a", FlowActionKind::Discard), ("dflt", FlowActionKind::Take)]
    );
}

#[test]
fn no_flow_taken_is_an_error() {
    let env = Environment::new();
    let flows = vec![
        flow("a", Some("${variables.missing}"), false),
        flow("b", Some("${variables.missing}"), false),
    ];
    let source = Content::for_element("gw", "exclusiveGateway");

    let err = evaluate_outbound(&flows, &source, &env, false).unwrap_err();
    match err {
        EngineError::Run(run) => {
            assert!(run.description.contains("no conditional flow taken"))
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn discard_rest_at_take_short_circuits() {
    let env = env_with("go", serde_json::json!(true));
    let flows = vec![
        flow("a", Some("${variables.go}"), false),
        flow("b", Some("${variables.go}"), false),
    ];
    let source = Content::for_element("gw", "exclusiveGateway");

    let actions = evaluate_outbound(&flows, &source, &env, true).unwrap();
    assert_eq!(
        kinds(&actions),
        vec![("a", FlowActionKind::Take), ("b", FlowActionKind::Discard)]
    );
}

#[test]
fn unconditional_flows_all_take() {
    let env = Environment::new();
    let flows = vec![flow("a", None, false), flow("b", None, false)];
    let source = Content::for_element("fork", "parallelGateway");

    let actions = evaluate_outbound(&flows, &source, &env, false).unwrap();
    assert!(actions.iter().all(FlowAction::is_take));
}

#[test]
fn zero_outbound_flows_complete_empty() {
    let env = Environment::new();
    let source = Content::for_element("end", "endEvent");
    assert!(evaluate_outbound(&[], &source, &env, false).unwrap().is_empty());
}

#[test]
fn discards_extend_the_discard_sequence() {
    let env = Environment::new();
    let flows = vec![flow("a", None, false)];
    let mut source = Content::for_element("task", "task");
    source.discard_sequence = vec!["earlier".to_string()];

    let actions = discard_outbound(&flows, &source);
    assert_eq!(actions[0].discard_sequence, vec!["earlier", "task"]);
}
