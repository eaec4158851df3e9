// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process graph collaborator
//!
//! The engine consumes a parsed process definition through `ProcessGraph`.
//! `Graph`/`GraphBuilder` provide the in-memory implementation hosts and
//! tests use; parsing source notation into it stays outside the engine.

use crate::element::{
    AssociationDefinition, DataObjectDefinition, ElementDefinition, ElementType,
    EventDefinitionSpec, MessageFlowDefinition, ProcessDefinition, SequenceFlowDefinition,
};

/// Filter for start activities: by event-definition type and/or reference id
#[derive(Debug, Clone, Default)]
pub struct StartFilter {
    /// Event definition type name, e.g. `message`, `signal`
    pub event_kind: Option<String>,
    /// Referenced message/signal id the start event must point at
    pub reference_id: Option<String>,
}

impl StartFilter {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn event(kind: impl Into<String>, reference_id: Option<String>) -> Self {
        Self {
            event_kind: Some(kind.into()),
            reference_id,
        }
    }

    fn matches(&self, element: &ElementDefinition) -> bool {
        let Some(kind) = self.event_kind.as_deref() else {
            // No filter: plain starts only, event-triggered ones wait for
            // their trigger.
            return element.event_definitions.is_empty();
        };
        element.event_definitions.iter().any(|spec| {
            spec.type_name() == kind
                && match (&self.reference_id, spec) {
                    (None, _) => true,
                    (Some(id), EventDefinitionSpec::Message { message_ref }) => {
                        message_ref.as_deref() == Some(id.as_str())
                    }
                    (Some(id), EventDefinitionSpec::Signal { signal_ref }) => {
                        signal_ref.as_deref() == Some(id.as_str())
                    }
                    _ => false,
                }
        })
    }
}

/// Read-only view of a parsed process definition
pub trait ProcessGraph: Send + Sync {
    fn activity_by_id(&self, id: &str) -> Option<&ElementDefinition>;
    fn sequence_flow_by_id(&self, id: &str) -> Option<&SequenceFlowDefinition>;
    fn inbound_sequence_flows(&self, activity_id: &str) -> Vec<&SequenceFlowDefinition>;
    fn outbound_sequence_flows(&self, activity_id: &str) -> Vec<&SequenceFlowDefinition>;
    fn inbound_associations(&self, activity_id: &str) -> Vec<&AssociationDefinition>;
    fn outbound_associations(&self, activity_id: &str) -> Vec<&AssociationDefinition>;
    fn activities(&self, scope_id: &str) -> Vec<&ElementDefinition>;
    fn sequence_flows(&self, scope_id: &str) -> Vec<&SequenceFlowDefinition>;
    fn associations(&self, scope_id: &str) -> Vec<&AssociationDefinition>;
    fn process_by_id(&self, id: &str) -> Option<&ProcessDefinition>;
    fn processes(&self) -> Vec<&ProcessDefinition>;
    fn executable_processes(&self) -> Vec<&ProcessDefinition>;
    fn message_flows(&self, source_process_id: &str) -> Vec<&MessageFlowDefinition>;
    fn data_object_by_id(&self, id: &str) -> Option<&DataObjectDefinition>;
    fn data_store_by_id(&self, id: &str) -> Option<&DataObjectDefinition>;
    fn start_activities(&self, filter: &StartFilter, scope_id: &str) -> Vec<&ElementDefinition>;
}

/// In-memory process graph
#[derive(Debug, Clone, Default)]
pub struct Graph {
    processes: Vec<ProcessDefinition>,
    activities: Vec<ElementDefinition>,
    flows: Vec<SequenceFlowDefinition>,
    associations: Vec<AssociationDefinition>,
    message_flows: Vec<MessageFlowDefinition>,
    data_objects: Vec<DataObjectDefinition>,
    data_stores: Vec<DataObjectDefinition>,
}

impl ProcessGraph for Graph {
    fn activity_by_id(&self, id: &str) -> Option<&ElementDefinition> {
        self.activities.iter().find(|a| a.id == id)
    }

    fn sequence_flow_by_id(&self, id: &str) -> Option<&SequenceFlowDefinition> {
        self.flows.iter().find(|f| f.id == id)
    }

    fn inbound_sequence_flows(&self, activity_id: &str) -> Vec<&SequenceFlowDefinition> {
        self.flows
            .iter()
            .filter(|f| f.target_ref == activity_id)
            .collect()
    }

    fn outbound_sequence_flows(&self, activity_id: &str) -> Vec<&SequenceFlowDefinition> {
        self.flows
            .iter()
            .filter(|f| f.source_ref == activity_id)
            .collect()
    }

    fn inbound_associations(&self, activity_id: &str) -> Vec<&AssociationDefinition> {
        self.associations
            .iter()
            .filter(|a| a.target_ref == activity_id)
            .collect()
    }

    fn outbound_associations(&self, activity_id: &str) -> Vec<&AssociationDefinition> {
        self.associations
            .iter()
            .filter(|a| a.source_ref == activity_id)
            .collect()
    }

    fn activities(&self, scope_id: &str) -> Vec<&ElementDefinition> {
        self.activities
            .iter()
            .filter(|a| a.parent_id == scope_id)
            .collect()
    }

    fn sequence_flows(&self, scope_id: &str) -> Vec<&SequenceFlowDefinition> {
        self.flows
            .iter()
            .filter(|f| f.parent_id == scope_id)
            .collect()
    }

    fn associations(&self, scope_id: &str) -> Vec<&AssociationDefinition> {
        self.associations
            .iter()
            .filter(|a| a.parent_id == scope_id)
            .collect()
    }

    fn process_by_id(&self, id: &str) -> Option<&ProcessDefinition> {
        self.processes.iter().find(|p| p.id == id)
    }

    fn processes(&self) -> Vec<&ProcessDefinition> {
        self.processes.iter().collect()
    }

    fn executable_processes(&self) -> Vec<&ProcessDefinition> {
        self.processes.iter().filter(|p| p.is_executable).collect()
    }

    fn message_flows(&self, source_process_id: &str) -> Vec<&MessageFlowDefinition> {
        self.message_flows
            .iter()
            .filter(|m| m.source_process_id == source_process_id)
            .collect()
    }

    fn data_object_by_id(&self, id: &str) -> Option<&DataObjectDefinition> {
        self.data_objects.iter().find(|d| d.id == id)
    }

    fn data_store_by_id(&self, id: &str) -> Option<&DataObjectDefinition> {
        self.data_stores.iter().find(|d| d.id == id)
    }

    fn start_activities(&self, filter: &StartFilter, scope_id: &str) -> Vec<&ElementDefinition> {
        self.activities
            .iter()
            .filter(|a| a.parent_id == scope_id && a.is_start && filter.matches(a))
            .collect()
    }
}

/// Fluent builder for in-memory graphs
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
    scope: String,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a process and make it the current scope
    pub fn process(mut self, id: impl Into<String>, is_executable: bool) -> Self {
        let id = id.into();
        self.graph.processes.push(ProcessDefinition {
            id: id.clone(),
            name: None,
            is_executable,
        });
        self.scope = id;
        self
    }

    /// Switch the current scope, e.g. into a sub-process
    pub fn scope(mut self, id: impl Into<String>) -> Self {
        self.scope = id.into();
        self
    }

    pub fn element(mut self, def: ElementDefinition) -> Self {
        self.graph.activities.push(def);
        self
    }

    fn add(self, id: impl Into<String>, kind: ElementType) -> Self {
        let def = ElementDefinition::new(id, kind, self.scope.clone());
        self.element(def)
    }

    pub fn start_event(self, id: impl Into<String>) -> Self {
        let mut b = self.add(id, ElementType::StartEvent);
        if let Some(last) = b.graph.activities.last_mut() {
            last.is_start = true;
        }
        b
    }

    pub fn end_event(self, id: impl Into<String>) -> Self {
        self.add(id, ElementType::EndEvent)
    }

    pub fn task(self, id: impl Into<String>) -> Self {
        self.add(id, ElementType::Task)
    }

    pub fn service_task(self, id: impl Into<String>, service: &str) -> Self {
        let mut b = self.add(id, ElementType::ServiceTask);
        if let Some(last) = b.graph.activities.last_mut() {
            last.behaviour
                .insert("service".to_string(), serde_json::json!(service));
        }
        b
    }

    pub fn user_task(self, id: impl Into<String>) -> Self {
        self.add(id, ElementType::UserTask)
    }

    pub fn exclusive_gateway(self, id: impl Into<String>) -> Self {
        self.add(id, ElementType::ExclusiveGateway)
    }

    pub fn inclusive_gateway(self, id: impl Into<String>) -> Self {
        self.add(id, ElementType::InclusiveGateway)
    }

    pub fn parallel_gateway(self, id: impl Into<String>) -> Self {
        self.add(id, ElementType::ParallelGateway)
    }

    pub fn sub_process(self, id: impl Into<String>) -> Self {
        self.add(id, ElementType::SubProcess)
    }

    pub fn call_activity(self, id: impl Into<String>, called_element: &str) -> Self {
        let mut b = self.add(id, ElementType::CallActivity);
        if let Some(last) = b.graph.activities.last_mut() {
            last.behaviour
                .insert("calledElement".to_string(), serde_json::json!(called_element));
        }
        b
    }

    pub fn intermediate_catch(self, id: impl Into<String>, spec: EventDefinitionSpec) -> Self {
        let mut b = self.add(id, ElementType::IntermediateCatchEvent);
        if let Some(last) = b.graph.activities.last_mut() {
            last.event_definitions.push(spec);
        }
        b
    }

    pub fn intermediate_throw(self, id: impl Into<String>, spec: EventDefinitionSpec) -> Self {
        let mut b = self.add(id, ElementType::IntermediateThrowEvent);
        if let Some(last) = b.graph.activities.last_mut() {
            last.event_definitions.push(spec);
        }
        b
    }

    pub fn boundary_event(
        self,
        id: impl Into<String>,
        attached_to: &str,
        spec: EventDefinitionSpec,
    ) -> Self {
        let mut b = self.add(id, ElementType::BoundaryEvent);
        if let Some(last) = b.graph.activities.last_mut() {
            last.attached_to = Some(attached_to.to_string());
            last.event_definitions.push(spec);
        }
        b
    }

    pub fn error_end_event(self, id: impl Into<String>, code: Option<&str>) -> Self {
        let mut b = self.add(id, ElementType::EndEvent);
        if let Some(last) = b.graph.activities.last_mut() {
            last.event_definitions.push(EventDefinitionSpec::Error {
                error_code: code.map(str::to_string),
            });
        }
        b
    }

    pub fn terminate_end_event(self, id: impl Into<String>) -> Self {
        let mut b = self.add(id, ElementType::EndEvent);
        if let Some(last) = b.graph.activities.last_mut() {
            last.event_definitions.push(EventDefinitionSpec::Terminate);
        }
        b
    }

    /// Apply loop characteristics to the most recently added element
    pub fn with_loop(mut self, loop_characteristics: crate::element::LoopCharacteristics) -> Self {
        if let Some(last) = self.graph.activities.last_mut() {
            last.loop_characteristics = Some(loop_characteristics);
        }
        self
    }

    /// Add an event definition to the most recently added element
    pub fn with_event_definition(mut self, spec: EventDefinitionSpec) -> Self {
        if let Some(last) = self.graph.activities.last_mut() {
            last.event_definitions.push(spec);
        }
        self
    }

    /// Set a behaviour field on the most recently added element
    pub fn with_behaviour(mut self, key: &str, value: serde_json::Value) -> Self {
        if let Some(last) = self.graph.activities.last_mut() {
            last.behaviour.insert(key.to_string(), value);
        }
        self
    }

    pub fn flow(mut self, id: impl Into<String>, source: &str, target: &str) -> Self {
        self.graph.flows.push(SequenceFlowDefinition {
            id: id.into(),
            parent_id: self.scope.clone(),
            source_ref: source.to_string(),
            target_ref: target.to_string(),
            condition: None,
            is_default: false,
        });
        self
    }

    pub fn conditional_flow(
        mut self,
        id: impl Into<String>,
        source: &str,
        target: &str,
        condition: &str,
    ) -> Self {
        self.graph.flows.push(SequenceFlowDefinition {
            id: id.into(),
            parent_id: self.scope.clone(),
            source_ref: source.to_string(),
            target_ref: target.to_string(),
            condition: Some(condition.to_string()),
            is_default: false,
        });
        self
    }

    pub fn default_flow(mut self, id: impl Into<String>, source: &str, target: &str) -> Self {
        self.graph.flows.push(SequenceFlowDefinition {
            id: id.into(),
            parent_id: self.scope.clone(),
            source_ref: source.to_string(),
            target_ref: target.to_string(),
            condition: None,
            is_default: true,
        });
        self
    }

    pub fn association(mut self, id: impl Into<String>, source: &str, target: &str) -> Self {
        self.graph.associations.push(AssociationDefinition {
            id: id.into(),
            parent_id: self.scope.clone(),
            source_ref: source.to_string(),
            target_ref: target.to_string(),
        });
        self
    }

    pub fn message_flow(
        mut self,
        id: impl Into<String>,
        source_process: &str,
        target_process: &str,
        target_activity: Option<&str>,
    ) -> Self {
        self.graph.message_flows.push(MessageFlowDefinition {
            id: id.into(),
            source_process_id: source_process.to_string(),
            source_activity_id: None,
            target_process_id: target_process.to_string(),
            target_activity_id: target_activity.map(str::to_string),
        });
        self
    }

    pub fn data_object(mut self, id: impl Into<String>) -> Self {
        self.graph.data_objects.push(DataObjectDefinition {
            id: id.into(),
            parent_id: self.scope.clone(),
            name: None,
        });
        self
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
