// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::activity::ActivityCounters;
use serde_json::json;
use weir_core::{EventDefinitionSpec, Graph, GraphBuilder};

fn scope_for(graph: &Graph, environment: Environment) -> ScopeExecution {
    ScopeExecution::new("main", "process", "main_1", environment, graph)
}

fn run(graph: &Graph, environment: Environment) -> ScopeExecution {
    let mut scope = scope_for(graph, environment);
    scope.run(graph, None, None, false).unwrap();
    scope.drain(graph).unwrap();
    scope
}

fn counters(scope: &ScopeExecution, id: &str) -> ActivityCounters {
    scope
        .activities()
        .iter()
        .find(|a| a.id() == id)
        .expect("element")
        .counters
}

#[test]
fn linear_sequence_runs_to_completion() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .task("work")
        .end_event("end")
        .flow("f1", "start", "work")
        .flow("f2", "work", "end")
        .build();
    let scope = run(&graph, Environment::new());
    assert!(scope.is_completed());
    assert!(scope.error().is_none());
    for id in ["start", "work", "end"] {
        assert_eq!(counters(&scope, id), ActivityCounters { taken: 1, discarded: 0 });
    }
    let f1 = scope.flows().iter().find(|f| f.id() == "f1").expect("flow");
    assert_eq!(f1.counters.take, 1);
}

#[test]
fn exclusive_gateway_takes_one_and_discards_the_rest() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .exclusive_gateway("decide")
        .task("yes")
        .task("no")
        .end_event("end")
        .flow("f1", "start", "decide")
        .conditional_flow("f2", "decide", "yes", "${variables.approved}")
        .default_flow("f3", "decide", "no")
        .flow("f4", "yes", "end")
        .flow("f5", "no", "end")
        .build();
    let environment =
        Environment::new().with_variables([("approved".to_string(), json!(true))].into());
    let scope = run(&graph, environment);
    assert!(scope.is_completed());
    assert_eq!(counters(&scope, "yes"), ActivityCounters { taken: 1, discarded: 0 });
    assert_eq!(counters(&scope, "no"), ActivityCounters { taken: 0, discarded: 1 });
    // The end element saw one take and one discard, and ran on the take.
    assert_eq!(counters(&scope, "end"), ActivityCounters { taken: 1, discarded: 0 });
}

#[test]
fn no_conditional_flow_taken_is_an_error() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .exclusive_gateway("decide")
        .end_event("end")
        .flow("f1", "start", "decide")
        .conditional_flow("f2", "decide", "end", "${variables.approved}")
        .build();
    let environment =
        Environment::new().with_variables([("approved".to_string(), json!(false))].into());
    let scope = run(&graph, environment);
    assert!(!scope.is_completed());
    let error = scope.error().expect("uncaught run error");
    assert!(error.to_string().contains("no conditional flow taken"));
}

#[test]
fn parallel_fork_and_join_complete_once() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .parallel_gateway("fork")
        .task("a")
        .task("b")
        .parallel_gateway("join")
        .end_event("end")
        .flow("f1", "start", "fork")
        .flow("f2", "fork", "a")
        .flow("f3", "fork", "b")
        .flow("f4", "a", "join")
        .flow("f5", "b", "join")
        .flow("f6", "join", "end")
        .build();
    let scope = run(&graph, Environment::new());
    assert!(scope.is_completed());
    assert_eq!(counters(&scope, "join"), ActivityCounters { taken: 1, discarded: 0 });
    assert_eq!(counters(&scope, "end"), ActivityCounters { taken: 1, discarded: 0 });
}

#[test]
fn boundary_event_catches_a_task_error() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .service_task("pay", "charge")
        .boundary_event(
            "on_error",
            "pay",
            EventDefinitionSpec::Error { error_code: None },
        )
        .end_event("done")
        .end_event("failed")
        .flow("f1", "start", "pay")
        .flow("f2", "pay", "done")
        .flow("f3", "on_error", "failed")
        .build();
    let environment = Environment::new().with_service("charge", |_: &serde_json::Value| {
        Err(weir_core::BpmnError::new("declined", Some("E402".to_string())))
    });
    let scope = run(&graph, environment);
    assert!(scope.is_completed(), "the error was caught");
    assert!(scope.error().is_none());
    assert_eq!(counters(&scope, "pay"), ActivityCounters { taken: 0, discarded: 1 });
    assert_eq!(counters(&scope, "on_error"), ActivityCounters { taken: 1, discarded: 0 });
    assert_eq!(counters(&scope, "failed"), ActivityCounters { taken: 1, discarded: 0 });
    assert_eq!(counters(&scope, "done"), ActivityCounters { taken: 0, discarded: 1 });
}

#[test]
fn boundary_is_discarded_when_its_host_completes() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .service_task("pay", "charge")
        .boundary_event(
            "on_error",
            "pay",
            EventDefinitionSpec::Error { error_code: None },
        )
        .end_event("done")
        .end_event("failed")
        .flow("f1", "start", "pay")
        .flow("f2", "pay", "done")
        .flow("f3", "on_error", "failed")
        .build();
    let environment = Environment::new()
        .with_service("charge", |_: &serde_json::Value| Ok(json!("ok")));
    let scope = run(&graph, environment);
    assert!(scope.is_completed());
    assert_eq!(counters(&scope, "pay"), ActivityCounters { taken: 1, discarded: 0 });
    assert_eq!(counters(&scope, "on_error"), ActivityCounters { taken: 0, discarded: 1 });
    assert_eq!(counters(&scope, "done"), ActivityCounters { taken: 1, discarded: 0 });
}

#[test]
fn terminate_end_discards_everything_still_running() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .parallel_gateway("fork")
        .user_task("hold")
        .terminate_end_event("kill")
        .flow("f1", "start", "fork")
        .flow("f2", "fork", "hold")
        .flow("f3", "fork", "kill")
        .build();
    let scope = run(&graph, Environment::new());
    assert!(scope.is_completed());
    assert!(scope.is_terminated());
    assert_eq!(counters(&scope, "kill"), ActivityCounters { taken: 1, discarded: 0 });
    assert_eq!(counters(&scope, "hold"), ActivityCounters { taken: 0, discarded: 1 });
}

#[test]
fn discard_chain_stops_at_a_loop() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .exclusive_gateway("decide")
        .task("back")
        .end_event("end")
        .flow("f1", "start", "decide")
        .conditional_flow("f2", "decide", "end", "${variables.done}")
        .default_flow("f3", "decide", "back")
        .flow("f4", "back", "decide")
        .build();
    let environment =
        Environment::new().with_variables([("done".to_string(), json!(true))].into());
    let mut scope = scope_for(&graph, environment);
    scope.run(&graph, None, None, false).unwrap();
    scope.drain(&graph).unwrap();

    assert!(scope.is_completed(), "discard chain must terminate");
    assert_eq!(counters(&scope, "back"), ActivityCounters { taken: 0, discarded: 1 });
    let looped = scope.flows().iter().find(|f| f.id() == "f4").expect("flow");
    assert_eq!(looped.counters.looped, 1);
    assert_eq!(looped.counters.discard, 0);
    let events = scope.take_events();
    assert!(events.iter().any(|(key, _)| key == "flow.looped"));
}

#[test]
fn events_from_direct_children_carry_the_scope_as_parent() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .end_event("end")
        .flow("f1", "start", "end")
        .build();
    let mut scope = scope_for(&graph, Environment::new());
    scope.run(&graph, None, None, false).unwrap();
    scope.drain(&graph).unwrap();
    let events = scope.take_events();
    let (_, enter) = events
        .iter()
        .find(|(key, _)| key == "activity.enter")
        .expect("enter event");
    let parent = enter.parent.as_ref().expect("parent stamped");
    assert_eq!(parent.id, "main");
    assert_eq!(parent.execution_id, "main_1");
}

#[test]
fn signal_catch_event_holds_the_scope_until_delivered() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .intermediate_catch(
            "wait_go",
            EventDefinitionSpec::Signal {
                signal_ref: Some("go".to_string()),
            },
        )
        .end_event("end")
        .flow("f1", "start", "wait_go")
        .flow("f2", "wait_go", "end")
        .build();
    let mut scope = scope_for(&graph, Environment::new());
    scope.run(&graph, None, None, false).unwrap();
    scope.drain(&graph).unwrap();
    assert!(!scope.is_completed());
    assert_eq!(scope.get_postponed().len(), 1);

    let delivered = scope
        .deliver(
            &ApiMessage::default(),
            &CatchTrigger::Signal {
                reference: Some("go".to_string()),
            },
            Some(json!("payload")),
            &graph,
        )
        .unwrap();
    assert!(delivered);
    scope.drain(&graph).unwrap();
    assert!(scope.is_completed());
    assert_eq!(counters(&scope, "wait_go"), ActivityCounters { taken: 1, discarded: 0 });
}

#[test]
fn stop_state_recover_resume_round_trip() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .user_task("approve")
        .end_event("end")
        .flow("f1", "start", "approve")
        .flow("f2", "approve", "end")
        .build();
    let mut scope = scope_for(&graph, Environment::new());
    scope.run(&graph, None, None, false).unwrap();
    scope.drain(&graph).unwrap();
    assert!(!scope.is_completed());

    let environment = Environment::new();
    scope.stop(&environment);
    let state = scope.state();
    let json = serde_json::to_string(&state).unwrap();
    let restored: crate::state::ScopeState = serde_json::from_str(&json).unwrap();

    let mut recovered = ScopeExecution::recover(
        "main",
        "process",
        &restored,
        Environment::new().recover(restored.environment.clone()),
        &graph,
    );
    recovered.resume(&graph).unwrap();
    assert!(!recovered.is_completed());
    assert_eq!(recovered.get_postponed().len(), 1);

    let delivered = recovered
        .deliver(
            &ApiMessage::for_id("approve"),
            &CatchTrigger::Api,
            None,
            &graph,
        )
        .unwrap();
    assert!(delivered);
    recovered.drain(&graph).unwrap();
    assert!(recovered.is_completed());
    assert_eq!(
        counters(&recovered, "approve"),
        ActivityCounters { taken: 1, discarded: 0 }
    );
    assert_eq!(counters(&recovered, "start"), ActivityCounters { taken: 1, discarded: 0 });
}

#[test]
fn caught_compensation_runs_the_associated_handler() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .parallel_gateway("fork")
        .user_task("work")
        .intermediate_throw("trigger", EventDefinitionSpec::Compensate)
        .boundary_event("comp", "work", EventDefinitionSpec::Compensate)
        .task("undo")
        .end_event("done")
        .end_event("told")
        .flow("f1", "start", "fork")
        .flow("f2", "fork", "work")
        .flow("f3", "fork", "trigger")
        .flow("f4", "work", "done")
        .flow("f5", "trigger", "told")
        .association("a1", "comp", "undo")
        .build();
    let mut scope = run(&graph, Environment::new());
    assert!(!scope.is_completed(), "user task still waiting");
    assert_eq!(counters(&scope, "comp"), ActivityCounters { taken: 1, discarded: 0 });
    assert_eq!(counters(&scope, "undo"), ActivityCounters { taken: 1, discarded: 0 });

    let delivered = scope
        .deliver(&ApiMessage::for_id("work"), &CatchTrigger::Api, None, &graph)
        .unwrap();
    assert!(delivered);
    scope.drain(&graph).unwrap();
    assert!(scope.is_completed());
    assert_eq!(counters(&scope, "work"), ActivityCounters { taken: 1, discarded: 0 });
}
