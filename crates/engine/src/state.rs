// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serializable snapshots, one struct per execution layer
//!
//! `get_state()` produces these, `recover(state)` consumes them. A snapshot
//! embeds each layer's broker state so the unacknowledged messages that
//! represent in-flight work come back as redeliveries; recover followed by
//! resume reproduces the same event sequence an uninterrupted run would.

use crate::activity::{ActivityCounters, Status};
use crate::behaviour::LoopState;
use crate::eventdef::Wait;
use crate::flow::FlowCounters;
use crate::process::ProcessCounters;
use serde::{Deserialize, Serialize};
use weir_broker::BrokerState;
use weir_core::error::ErrorDetail;
use weir_core::{EnvironmentState, FlowAction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    pub id: String,
    #[serde(default)]
    pub counters: FlowCounters,
}

/// One element's nested execution, present while it is running
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionState {
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<Wait>,
    /// Sub-process scope, when the behavior spawned one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<Box<ScopeState>>,
    /// Multi-instance loop progress
    #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_state: Option<LoopState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityState {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub counters: ActivityCounters,
    #[serde(default)]
    pub stopped: bool,
    #[serde(default)]
    pub broker: BrokerState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionState>,
    /// Inbound triggers accumulated by a parallel join that has not converged
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending_join: Vec<FlowAction>,
}

/// State of one scope: a process body or a sub-process body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeState {
    pub id: String,
    pub execution_id: String,
    #[serde(default)]
    pub started: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub terminated: bool,
    #[serde(default)]
    pub stopped: bool,
    #[serde(default)]
    pub environment: EnvironmentState,
    #[serde(default)]
    pub activities: Vec<ActivityState>,
    #[serde(default)]
    pub flows: Vec<FlowState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessState {
    pub id: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub counters: ProcessCounters,
    pub scope: ScopeState,
}

/// Caller/callee binding of an in-flight call activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallBindingState {
    pub caller_execution_id: String,
    /// Index of the called instance in the definition's process list
    pub called_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionState {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub stopped: bool,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub environment: EnvironmentState,
    #[serde(default)]
    pub processes: Vec<ProcessState>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub calls: Vec<CallBindingState>,
    /// Error nothing caught, when the run already failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<ErrorDetail>,
    #[serde(default)]
    pub broker: BrokerState,
}
