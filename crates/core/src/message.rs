// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message envelope content
//!
//! Every message routed by a broker carries a `Content`: the element it
//! concerns, the execution id of the run, the owning parent chain, and any
//! behaviour payload. Parent `path` keeps the full ancestor chain so a layer
//! can resolve the owning scope without walking live object references.

use crate::error::ErrorDetail;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reference to an owning execution scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Parent {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub execution_id: String,
    /// Ancestors beyond the immediate parent, nearest first
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Parent>,
}

impl Parent {
    pub fn new(id: impl Into<String>, kind: impl Into<String>, execution_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            execution_id: execution_id.into(),
            path: Vec::new(),
        }
    }

    /// Make `owner` the immediate parent, pushing the previous parent (and
    /// its path) down into the chain. Used when a layer re-publishes a child
    /// event outward.
    pub fn shift(owner: Parent, previous: Option<Parent>) -> Parent {
        let mut parent = owner;
        if let Some(prev) = previous {
            let mut path = vec![Parent {
                path: Vec::new(),
                ..prev.clone()
            }];
            path.extend(prev.path);
            // The owner may already carry ancestors of its own.
            path.extend(std::mem::take(&mut parent.path));
            parent.path = path;
        }
        parent
    }

    /// Inverse of [`Parent::shift`]: drop the current owner and restore the
    /// previous immediate parent from the front of the chain. `None` when the
    /// chain had a single level.
    pub fn unshift(parent: Parent) -> Option<Parent> {
        let mut path = parent.path;
        if path.is_empty() {
            return None;
        }
        let mut head = path.remove(0);
        head.path = path;
        Some(head)
    }

    /// True if this chain contains the given execution id at any depth
    pub fn contains_execution(&self, execution_id: &str) -> bool {
        self.execution_id == execution_id
            || self.path.iter().any(|p| p.execution_id == execution_id)
    }
}

/// Outcome of evaluating one outbound flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FlowActionKind {
    Take,
    Discard,
}

/// One `{id, action, targetId}` record produced by the outbound evaluator,
/// also used as the inbound trigger accumulated by joins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowAction {
    pub id: String,
    pub action: FlowActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Chain of already-discarded source ids, used for loop termination
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discard_sequence: Vec<String>,
    /// Payload merged from the triggering message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
}

impl FlowAction {
    pub fn take(id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action: FlowActionKind::Take,
            target_id: Some(target_id.into()),
            source_id: None,
            discard_sequence: Vec::new(),
            message: None,
        }
    }

    pub fn discard(id: impl Into<String>, target_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            action: FlowActionKind::Discard,
            target_id: Some(target_id.into()),
            source_id: None,
            discard_sequence: Vec::new(),
            message: None,
        }
    }

    pub fn is_take(&self) -> bool {
        matches!(self.action, FlowActionKind::Take)
    }
}

/// Message envelope content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Content {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub execution_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    /// Run state as last observed, e.g. `enter`, `wait`, `end`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Set on the message that completes the outermost scope of an execution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_root_scope: Option<bool>,
    /// Inbound triggers this run was started from
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inbound: Vec<FlowAction>,
    /// Outbound actions; supplied upstream (join, loop) or computed at end
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outbound: Option<Vec<FlowAction>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discard_sequence: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    /// Caught or thrown payload (signal body, message body, output)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    /// Everything behaviour-specific rides along untyped
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Content {
    pub fn for_element(id: &str, kind: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: kind.to_string(),
            ..Self::default()
        }
    }

    pub fn with_execution(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = execution_id.into();
        self
    }

    pub fn with_parent(mut self, parent: Parent) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Is this (or any ancestor in the parent chain) owned by `execution_id`?
    pub fn belongs_to(&self, execution_id: &str) -> bool {
        self.execution_id == execution_id
            || self
                .parent
                .as_ref()
                .is_some_and(|p| p.contains_execution(execution_id))
    }

    /// Extra-field accessor
    pub fn extra_bool(&self, key: &str) -> bool {
        self.extra.get(key).and_then(Value::as_bool).unwrap_or(false)
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
