// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External command addressing
//!
//! Hosts address running executions through the definition facade with an
//! [`ApiMessage`]; internally the command travels as an api-exchange message
//! keyed `activity.<verb>.<executionId>` to the owning layer. A
//! [`CatchTrigger`] is the decoded form a waiting behavior matches against.

use serde_json::Value;

/// Host command addressed to an element or a specific execution
#[derive(Debug, Clone, Default)]
pub struct ApiMessage {
    /// Element id; matches the element's current execution
    pub id: Option<String>,
    /// Exact execution id, when the caller tracked it
    pub execution_id: Option<String>,
    /// Payload handed to the waiting behavior (signal body, task output)
    pub message: Option<Value>,
}

impl ApiMessage {
    pub fn for_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn for_execution(execution_id: impl Into<String>) -> Self {
        Self {
            execution_id: Some(execution_id.into()),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: Value) -> Self {
        self.message = Some(message);
        self
    }

    /// Anonymous broadcast: no element addressed, delegated to every scope
    pub fn is_broadcast(&self) -> bool {
        self.id.is_none() && self.execution_id.is_none()
    }
}

/// Decoded trigger a waiting behavior is offered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatchTrigger {
    /// Directly addressed by id/execution id; matches any wait
    Api,
    Signal { reference: Option<String> },
    Message { reference: Option<String> },
    Timer { timer_id: String },
    Error { code: Option<String> },
    Escalation { code: Option<String> },
    Link { name: String },
    Cancel,
    Compensate,
}

impl CatchTrigger {
    /// Api verb used in the routing key
    pub fn verb(&self) -> &'static str {
        match self {
            CatchTrigger::Api => "signal",
            CatchTrigger::Signal { .. } => "signal",
            CatchTrigger::Message { .. } => "message",
            CatchTrigger::Timer { .. } => "timer",
            CatchTrigger::Error { .. } => "error",
            CatchTrigger::Escalation { .. } => "escalate",
            CatchTrigger::Link { .. } => "link",
            CatchTrigger::Cancel => "cancel",
            CatchTrigger::Compensate => "compensate",
        }
    }
}
