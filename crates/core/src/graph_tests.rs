// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn two_branch_graph() -> Graph {
    GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .exclusive_gateway("decision")
        .task("approve")
        .task("reject")
        .end_event("end")
        .flow("to-decision", "start", "decision")
        .conditional_flow("take-approve", "decision", "approve", "${variables.ok}")
        .default_flow("take-reject", "decision", "reject")
        .flow("approve-end", "approve", "end")
        .flow("reject-end", "reject", "end")
        .build()
}

#[test]
fn lookups_by_id_and_scope() {
    let graph = two_branch_graph();
    assert_eq!(graph.activity_by_id("decision").unwrap().kind, ElementType::ExclusiveGateway);
    assert!(graph.activity_by_id("missing").is_none());
    assert_eq!(graph.activities("main").len(), 5);
    assert_eq!(graph.sequence_flows("main").len(), 5);
    assert!(graph.process_by_id("main").unwrap().is_executable);
}

#[test]
fn inbound_and_outbound_flows_resolve_by_reference() {
    let graph = two_branch_graph();
    let out = graph.outbound_sequence_flows("decision");
    let ids: Vec<&str> = out.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["take-approve", "take-reject"]);
    assert!(out[1].is_default);

    let inbound = graph.inbound_sequence_flows("end");
    assert_eq!(inbound.len(), 2);
}

#[test]
fn start_activities_respect_the_filter() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("plain-start")
        .start_event("msg-start")
        .with_event_definition(EventDefinitionSpec::Message {
            message_ref: Some("order".to_string()),
        })
        .build();

    let plain = graph.start_activities(&StartFilter::none(), "main");
    assert_eq!(plain.len(), 1);
    assert_eq!(plain[0].id, "plain-start");

    let by_message = graph.start_activities(
        &StartFilter::event("message", Some("order".to_string())),
        "main",
    );
    assert_eq!(by_message.len(), 1);
    assert_eq!(by_message[0].id, "msg-start");

    let wrong_ref = graph.start_activities(
        &StartFilter::event("message", Some("other".to_string())),
        "main",
    );
    assert!(wrong_ref.is_empty());
}

#[test]
fn scopes_partition_nested_elements() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .sub_process("sub")
        .scope("sub")
        .start_event("sub-start")
        .end_event("sub-end")
        .flow("sub-flow", "sub-start", "sub-end")
        .scope("main")
        .end_event("end")
        .flow("to-sub", "start", "sub")
        .flow("to-end", "sub", "end")
        .build();

    let main_ids: Vec<&str> = graph.activities("main").iter().map(|a| a.id.as_str()).collect();
    assert_eq!(main_ids, vec!["start", "sub", "end"]);
    let sub_ids: Vec<&str> = graph.activities("sub").iter().map(|a| a.id.as_str()).collect();
    assert_eq!(sub_ids, vec!["sub-start", "sub-end"]);
    assert_eq!(graph.sequence_flows("sub").len(), 1);
}
