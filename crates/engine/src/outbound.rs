// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound flow evaluation
//!
//! Evaluates a node's outgoing flows in order. The default flow is moved to
//! the end of the candidate order and is taken only when no other flow took;
//! with `discard_rest_at_take` (exclusive gateways) everything after the
//! first take is discarded without evaluation. Results come back in the
//! original flow order, one record per flow.

use crate::error::EngineError;
use weir_core::expression::is_truthy;
use weir_core::{Content, Environment, FlowAction, FlowActionKind, RunError, SequenceFlowDefinition};

pub fn evaluate_outbound(
    flows: &[SequenceFlowDefinition],
    source: &Content,
    environment: &Environment,
    discard_rest_at_take: bool,
) -> Result<Vec<FlowAction>, EngineError> {
    // End-of-branch element: immediately completed with an empty result.
    if flows.is_empty() {
        return Ok(Vec::new());
    }

    let mut order: Vec<usize> = (0..flows.len()).filter(|i| !flows[*i].is_default).collect();
    order.extend((0..flows.len()).filter(|i| flows[*i].is_default));

    let mut actions: Vec<Option<FlowAction>> = vec![None; flows.len()];
    let mut taken = false;
    for idx in order {
        let flow = &flows[idx];
        if discard_rest_at_take && taken {
            actions[idx] = Some(action(flow, source, FlowActionKind::Discard));
            continue;
        }
        let take = if flow.is_default {
            // Pure fallback: never taken while another flow was taken.
            !taken
        } else if let Some(condition) = &flow.condition {
            let value = environment
                .resolve_expression(condition, source)
                .map_err(|e| RunError {
                    description: format!("condition on flow <{}>: {}", flow.id, e.message),
                    source_id: Some(flow.id.clone()),
                })?;
            is_truthy(&value)
        } else {
            true
        };
        if take {
            taken = true;
            actions[idx] = Some(action(flow, source, FlowActionKind::Take));
        } else {
            actions[idx] = Some(action(flow, source, FlowActionKind::Discard));
        }
    }

    if !taken {
        return Err(EngineError::Run(RunError {
            description: format!("no conditional flow taken from <{}>", source.id),
            source_id: Some(source.id.clone()),
        }));
    }
    Ok(actions.into_iter().flatten().collect())
}

/// All-discard result used when the element itself was discarded
pub fn discard_outbound(flows: &[SequenceFlowDefinition], source: &Content) -> Vec<FlowAction> {
    flows
        .iter()
        .map(|flow| action(flow, source, FlowActionKind::Discard))
        .collect()
}

fn action(flow: &SequenceFlowDefinition, source: &Content, kind: FlowActionKind) -> FlowAction {
    let mut discard_sequence = Vec::new();
    if matches!(kind, FlowActionKind::Discard) {
        discard_sequence = source.discard_sequence.clone();
        if !discard_sequence.iter().any(|id| *id == source.id) {
            discard_sequence.push(source.id.clone());
        }
    }
    FlowAction {
        id: flow.id.clone(),
        action: kind,
        target_id: Some(flow.target_ref.clone()),
        source_id: Some(source.id.clone()),
        discard_sequence,
        message: source.message.clone(),
    }
}

#[cfg(test)]
#[path = "outbound_tests.rs"]
mod tests;
