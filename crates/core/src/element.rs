// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Immutable element definitions
//!
//! These are the engine's view of a parsed process graph. Parsing from source
//! notation is a host concern; the engine only reads these structs through the
//! [`ProcessGraph`](crate::graph::ProcessGraph) trait.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Closed set of element types the engine dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementType {
    Process,
    StartEvent,
    EndEvent,
    IntermediateCatchEvent,
    IntermediateThrowEvent,
    BoundaryEvent,
    Task,
    ServiceTask,
    UserTask,
    ReceiveTask,
    ExclusiveGateway,
    InclusiveGateway,
    ParallelGateway,
    SubProcess,
    CallActivity,
    SequenceFlow,
    Association,
    MessageFlow,
    DataObject,
    DataStore,
}

impl ElementType {
    /// Element type name as it appears in message content
    pub fn name(&self) -> &'static str {
        match self {
            ElementType::Process => "process",
            ElementType::StartEvent => "startEvent",
            ElementType::EndEvent => "endEvent",
            ElementType::IntermediateCatchEvent => "intermediateCatchEvent",
            ElementType::IntermediateThrowEvent => "intermediateThrowEvent",
            ElementType::BoundaryEvent => "boundaryEvent",
            ElementType::Task => "task",
            ElementType::ServiceTask => "serviceTask",
            ElementType::UserTask => "userTask",
            ElementType::ReceiveTask => "receiveTask",
            ElementType::ExclusiveGateway => "exclusiveGateway",
            ElementType::InclusiveGateway => "inclusiveGateway",
            ElementType::ParallelGateway => "parallelGateway",
            ElementType::SubProcess => "subProcess",
            ElementType::CallActivity => "callActivity",
            ElementType::SequenceFlow => "sequenceFlow",
            ElementType::Association => "association",
            ElementType::MessageFlow => "messageFlow",
            ElementType::DataObject => "dataObject",
            ElementType::DataStore => "dataStore",
        }
    }

    /// Gateways that join multiple inbound flows before proceeding
    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            ElementType::ExclusiveGateway
                | ElementType::InclusiveGateway
                | ElementType::ParallelGateway
        )
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Event definition attached to a catching or throwing element.
///
/// Timer strings are resolved by the host before the graph reaches the
/// engine; only the delay and optional repeat count arrive here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EventDefinitionSpec {
    Timer {
        delay_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repeat: Option<u32>,
    },
    Message {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_ref: Option<String>,
    },
    Signal {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signal_ref: Option<String>,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error_code: Option<String>,
    },
    Escalation {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        escalation_code: Option<String>,
    },
    Link {
        name: String,
    },
    Cancel,
    Compensate,
    Terminate,
}

impl EventDefinitionSpec {
    pub fn type_name(&self) -> &'static str {
        match self {
            EventDefinitionSpec::Timer { .. } => "timer",
            EventDefinitionSpec::Message { .. } => "message",
            EventDefinitionSpec::Signal { .. } => "signal",
            EventDefinitionSpec::Error { .. } => "error",
            EventDefinitionSpec::Escalation { .. } => "escalation",
            EventDefinitionSpec::Link { .. } => "link",
            EventDefinitionSpec::Cancel => "cancel",
            EventDefinitionSpec::Compensate => "compensate",
            EventDefinitionSpec::Terminate => "terminate",
        }
    }
}

/// Multi-instance loop characteristics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LoopCharacteristics {
    pub is_sequential: bool,
    /// Expression or literal resolving to the iteration count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cardinality: Option<String>,
    /// Expression resolving to the collection to iterate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// Expression evaluated after each completed iteration; truthy stops the loop
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_condition: Option<String>,
}

/// One activity, gateway or event in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ElementType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Owning scope: a process id or sub-process element id
    pub parent_id: String,
    #[serde(default)]
    pub is_start: bool,
    #[serde(default)]
    pub is_for_compensation: bool,
    #[serde(default)]
    pub triggered_by_event: bool,
    /// Boundary events only: the monitored activity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attached_to: Option<String>,
    /// Interrupting boundary events cancel the monitored activity on catch
    #[serde(default = "default_true")]
    pub cancel_activity: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_definitions: Vec<EventDefinitionSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_characteristics: Option<LoopCharacteristics>,
    /// Behaviour-specific fields: service name, called element, error code...
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub behaviour: BTreeMap<String, Value>,
}

fn default_true() -> bool {
    true
}

impl ElementDefinition {
    pub fn new(id: impl Into<String>, kind: ElementType, parent_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            name: None,
            parent_id: parent_id.into(),
            is_start: false,
            is_for_compensation: false,
            triggered_by_event: false,
            attached_to: None,
            cancel_activity: true,
            event_definitions: Vec::new(),
            loop_characteristics: None,
            behaviour: BTreeMap::new(),
        }
    }

    pub fn is_sub_process(&self) -> bool {
        matches!(self.kind, ElementType::SubProcess)
    }

    pub fn is_parallel_gateway(&self) -> bool {
        matches!(self.kind, ElementType::ParallelGateway)
    }

    /// Behaviour field accessor, e.g. `service`, `called_element`, `error_code`
    pub fn behaviour_str(&self, key: &str) -> Option<&str> {
        self.behaviour.get(key).and_then(Value::as_str)
    }
}

/// A sequence flow between two elements in the same scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceFlowDefinition {
    pub id: String,
    pub parent_id: String,
    pub source_ref: String,
    pub target_ref: String,
    /// Condition expression; `None` means unconditional
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// An association, e.g. compensation wiring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationDefinition {
    pub id: String,
    pub parent_id: String,
    pub source_ref: String,
    pub target_ref: String,
}

/// A process inside the definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub is_executable: bool,
}

/// A message flow between two processes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageFlowDefinition {
    pub id: String,
    pub source_process_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_activity_id: Option<String>,
    pub target_process_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_activity_id: Option<String>,
}

/// A data object or data store reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataObjectDefinition {
    pub id: String,
    pub parent_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[cfg(test)]
#[path = "element_tests.rs"]
mod tests;
