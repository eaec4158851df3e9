// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shake: dry-run traversal of the sequences reachable from an element
//!
//! No behavior runs and no counters move; the result is one entry per
//! distinct path to an end element, or back to an already visited one.

use weir_core::ProcessGraph;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShakeRun {
    /// Element and flow ids in traversal order, starting element first
    pub sequence: Vec<String>,
    /// The path closed back on itself instead of reaching an end
    pub is_looped: bool,
}

pub fn shake(graph: &dyn ProcessGraph, from_id: &str) -> Vec<ShakeRun> {
    let mut runs = Vec::new();
    if graph.activity_by_id(from_id).is_none() {
        return runs;
    }
    walk(graph, from_id, vec![from_id.to_string()], &mut runs);
    runs
}

fn walk(graph: &dyn ProcessGraph, at: &str, sequence: Vec<String>, runs: &mut Vec<ShakeRun>) {
    let outbound = graph.outbound_sequence_flows(at);
    if outbound.is_empty() {
        runs.push(ShakeRun {
            sequence,
            is_looped: false,
        });
        return;
    }
    for flow in outbound {
        let mut next = sequence.clone();
        next.push(flow.id.clone());
        let target = flow.target_ref.clone();
        let looped = sequence.iter().any(|id| *id == target);
        next.push(target.clone());
        if looped {
            runs.push(ShakeRun {
                sequence: next,
                is_looped: true,
            });
        } else {
            walk(graph, &target, next, runs);
        }
    }
}

#[cfg(test)]
#[path = "shake_tests.rs"]
mod tests;
