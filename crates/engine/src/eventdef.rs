// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-definition execution
//!
//! One adapter runs the event definitions attached to a catching or throwing
//! node. Catching definitions register what they wait for (timers go into
//! the shared registry) and produce a [`Wait`] the owning activity matches
//! triggers against; throwing definitions produce the event to publish, an
//! error to raise, or a process termination.

use crate::api::CatchTrigger;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use weir_core::{BpmnError, Content, Environment, EventDefinitionSpec};

/// What a suspended behavior is waiting for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Wait {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub specs: Vec<EventDefinitionSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub timer_ids: Vec<String>,
    /// Plain user/receive-task wait with no event definitions
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub user: bool,
}

impl Wait {
    pub fn user() -> Self {
        Self {
            user: true,
            ..Self::default()
        }
    }

    /// Wait for a direct api signal only (e.g. a call activity)
    pub fn api() -> Self {
        Self::default()
    }

    pub fn matches(&self, trigger: &CatchTrigger) -> bool {
        match trigger {
            // Direct addressing overrides whatever is waited for.
            CatchTrigger::Api => true,
            CatchTrigger::Signal { reference } => {
                self.user
                    || self.specs.iter().any(|s| {
                        matches!(s, EventDefinitionSpec::Signal { signal_ref }
                            if ref_matches(signal_ref, reference))
                    })
            }
            CatchTrigger::Message { reference } => {
                self.user
                    || self.specs.iter().any(|s| {
                        matches!(s, EventDefinitionSpec::Message { message_ref }
                            if ref_matches(message_ref, reference))
                    })
            }
            CatchTrigger::Timer { timer_id } => self.timer_ids.iter().any(|t| t == timer_id),
            CatchTrigger::Error { code } => self.specs.iter().any(|s| {
                matches!(s, EventDefinitionSpec::Error { error_code }
                    if ref_matches(error_code, code))
            }),
            CatchTrigger::Escalation { code } => self.specs.iter().any(|s| {
                matches!(s, EventDefinitionSpec::Escalation { escalation_code }
                    if ref_matches(escalation_code, code))
            }),
            CatchTrigger::Link { name } => self
                .specs
                .iter()
                .any(|s| matches!(s, EventDefinitionSpec::Link { name: n } if n == name)),
            CatchTrigger::Cancel => self
                .specs
                .iter()
                .any(|s| matches!(s, EventDefinitionSpec::Cancel)),
            CatchTrigger::Compensate => self
                .specs
                .iter()
                .any(|s| matches!(s, EventDefinitionSpec::Compensate)),
        }
    }
}

// An unreferenced definition catches any instance of its kind.
fn ref_matches(expected: &Option<String>, offered: &Option<String>) -> bool {
    match (expected, offered) {
        (None, _) => true,
        (Some(_), None) => true,
        (Some(e), Some(o)) => e == o,
    }
}

/// Register catching definitions and describe the resulting wait.
///
/// Timer definitions register in the shared registry immediately; the other
/// kinds only record what would complete them.
pub fn execute_catching(
    specs: &[EventDefinitionSpec],
    content: &Content,
    environment: &Environment,
) -> Wait {
    let mut wait = Wait {
        specs: specs.to_vec(),
        timer_ids: Vec::new(),
        user: false,
    };
    for spec in specs {
        if let EventDefinitionSpec::Timer { delay_ms, repeat } = spec {
            let timer_id = environment.timers.set_timeout(
                content.execution_id.clone(),
                Duration::from_millis(*delay_ms),
                *repeat,
                content.clone(),
                environment.now(),
            );
            wait.timer_ids.push(timer_id);
        }
    }
    wait
}

/// A throwing definition's published event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThrownEvent {
    /// `activity.signal`, `activity.message`, `activity.escalate`, `activity.link`
    pub routing_key: &'static str,
    /// Event definition type name carried in the content
    pub kind: &'static str,
    /// Referenced signal/message id, escalation code or link name
    pub reference: Option<String>,
    /// Forward through ancestor scopes until somebody catches it
    pub delegate: bool,
}

/// Outcome of a throwing node's event definitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThrowOutcome {
    /// Plain throw (or no definitions): nothing to publish
    Completed,
    Thrown(Vec<ThrownEvent>),
    Error(BpmnError),
    Terminate,
}

pub fn execute_throwing(specs: &[EventDefinitionSpec], content: &Content) -> ThrowOutcome {
    let mut thrown = Vec::new();
    for spec in specs {
        match spec {
            EventDefinitionSpec::Error { error_code } => {
                return ThrowOutcome::Error(BpmnError::new(
                    content.id.clone(),
                    error_code.clone(),
                ));
            }
            EventDefinitionSpec::Terminate => return ThrowOutcome::Terminate,
            EventDefinitionSpec::Signal { signal_ref } => thrown.push(ThrownEvent {
                routing_key: "activity.signal",
                kind: "signal",
                reference: signal_ref.clone(),
                delegate: true,
            }),
            EventDefinitionSpec::Message { message_ref } => thrown.push(ThrownEvent {
                routing_key: "activity.message",
                kind: "message",
                reference: message_ref.clone(),
                delegate: true,
            }),
            EventDefinitionSpec::Escalation { escalation_code } => thrown.push(ThrownEvent {
                routing_key: "activity.escalate",
                kind: "escalation",
                reference: escalation_code.clone(),
                delegate: true,
            }),
            EventDefinitionSpec::Link { name } => thrown.push(ThrownEvent {
                routing_key: "activity.link",
                kind: "link",
                reference: Some(name.clone()),
                delegate: false,
            }),
            EventDefinitionSpec::Compensate => thrown.push(ThrownEvent {
                routing_key: "activity.compensate",
                kind: "compensate",
                reference: None,
                delegate: true,
            }),
            EventDefinitionSpec::Cancel => thrown.push(ThrownEvent {
                routing_key: "activity.cancel",
                kind: "cancel",
                reference: None,
                delegate: true,
            }),
            EventDefinitionSpec::Timer { .. } => {}
        }
    }
    if thrown.is_empty() {
        ThrowOutcome::Completed
    } else {
        ThrowOutcome::Thrown(thrown)
    }
}

#[cfg(test)]
#[path = "eventdef_tests.rs"]
mod tests;
