// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use weir_core::GraphBuilder;

fn diamond() -> weir_core::Graph {
    GraphBuilder::new()
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
        .build()
}

#[test]
fn traces_every_path_to_the_end() {
    let graph = diamond();
    let runs = shake(&graph, "start");
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|r| !r.is_looped));
    assert_eq!(
        runs[0].sequence,
        vec!["start", "f1", "fork", "f2", "a", "f4", "join", "f6", "end"]
    );
    assert_eq!(runs[1].sequence[4], "b");
}

#[test]
fn flags_a_cycle_without_recursing_forever() {
    let graph = GraphBuilder::new()
        .process("main", true)
        .start_event("start")
        .task("task")
        .exclusive_gateway("back")
        .flow("f1", "start", "task")
        .flow("f2", "task", "back")
        .flow("f3", "back", "task")
        .build();
    let runs = shake(&graph, "start");
    assert_eq!(runs.len(), 1);
    assert!(runs[0].is_looped);
    assert_eq!(runs[0].sequence.last().map(String::as_str), Some("task"));
}

#[test]
fn unknown_element_yields_nothing() {
    let graph = diamond();
    assert!(shake(&graph, "nope").is_empty());
}
