// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequence flow execution
//!
//! A flow either fires (take) or is bypassed (discard). Discards carry the
//! chain of already-discarded source ids; when that chain already contains
//! the flow's own target the flow reports `looped` instead and the discard
//! is not propagated further, which terminates discard cycles.

use crate::state::FlowState;
use serde::{Deserialize, Serialize};
use tracing::debug;
use weir_core::{Content, FlowAction, FlowActionKind, SequenceFlowDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowCounters {
    pub take: usize,
    pub discard: usize,
    pub looped: usize,
}

/// What applying a flow action produced
#[derive(Debug, Clone)]
pub struct FlowOutcome {
    /// `flow.take`, `flow.discard` or `flow.looped`
    pub routing_key: &'static str,
    pub content: Content,
    /// Inbound trigger for the target activity; `None` when looped
    pub deliver: Option<FlowAction>,
}

#[derive(Debug, Clone)]
pub struct SequenceFlow {
    pub def: SequenceFlowDefinition,
    pub counters: FlowCounters,
}

impl SequenceFlow {
    pub fn new(def: SequenceFlowDefinition) -> Self {
        Self {
            def,
            counters: FlowCounters::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn apply(&mut self, action: &FlowAction) -> FlowOutcome {
        match action.action {
            FlowActionKind::Take => {
                self.counters.take += 1;
                debug!(flow = %self.def.id, target = %self.def.target_ref, "take");
                FlowOutcome {
                    routing_key: "flow.take",
                    content: self.content(action),
                    deliver: Some(action.clone()),
                }
            }
            FlowActionKind::Discard => {
                if action
                    .discard_sequence
                    .iter()
                    .any(|id| *id == self.def.target_ref)
                {
                    // The discard chain already visited our target.
                    self.counters.looped += 1;
                    debug!(flow = %self.def.id, "looped");
                    return FlowOutcome {
                        routing_key: "flow.looped",
                        content: self.content(action),
                        deliver: None,
                    };
                }
                self.counters.discard += 1;
                debug!(flow = %self.def.id, target = %self.def.target_ref, "discard");
                FlowOutcome {
                    routing_key: "flow.discard",
                    content: self.content(action),
                    deliver: Some(action.clone()),
                }
            }
        }
    }

    fn content(&self, action: &FlowAction) -> Content {
        let mut content = Content::for_element(&self.def.id, "sequenceFlow");
        content.discard_sequence = action.discard_sequence.clone();
        content.message = action.message.clone();
        content.extra.insert(
            "sourceId".to_string(),
            serde_json::Value::String(self.def.source_ref.clone()),
        );
        content.extra.insert(
            "targetId".to_string(),
            serde_json::Value::String(self.def.target_ref.clone()),
        );
        content
    }

    pub fn state(&self) -> FlowState {
        FlowState {
            id: self.def.id.clone(),
            counters: self.counters,
        }
    }

    pub fn recover(&mut self, state: &FlowState) {
        self.counters = state.counters;
    }
}

#[cfg(test)]
#[path = "flow_tests.rs"]
mod tests;
