// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error kinds carried through messages and snapshots
//!
//! Three kinds exist: `ActivityError` wraps a failure during one element's
//! execution, `RunError` a failure in the run-level state machine, and
//! `BpmnError` a semantically named/coded business error raised on purpose.
//! All of them serialize so they can travel inside message content and
//! survive a snapshot round-trip.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named/coded business error, e.g. raised by an error end event
#[derive(Debug, Clone, Default, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[error("{name}{}", .code.as_deref().map(|c| format!(" ({c})")).unwrap_or_default())]
pub struct BpmnError {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl BpmnError {
    pub fn new(name: impl Into<String>, code: Option<String>) -> Self {
        Self {
            name: name.into(),
            code,
            description: String::new(),
        }
    }
}

/// Failure during one element's execution
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("activity {id} failed: {description}")]
pub struct ActivityError {
    /// Element id of the failing activity
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub execution_id: String,
    pub description: String,
    /// Routing key of the originating message, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// Inner business error, when the failure was a thrown `BpmnError`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<BpmnError>,
}

impl ActivityError {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            execution_id: String::new(),
            description: description.into(),
            source_id: None,
            inner: None,
        }
    }

    pub fn with_execution(mut self, execution_id: impl Into<String>) -> Self {
        self.execution_id = execution_id.into();
        self
    }

    pub fn with_inner(mut self, inner: BpmnError) -> Self {
        self.inner = Some(inner);
        self
    }
}

/// Failure in the run-level state machine, e.g. a malformed flow graph
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("run error: {description}")]
pub struct RunError {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

impl RunError {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            source_id: None,
        }
    }
}

/// Serializable error payload inside message content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ErrorDetail {
    ActivityError(ActivityError),
    RunError(RunError),
    BpmnError(BpmnError),
}

impl ErrorDetail {
    pub fn description(&self) -> &str {
        match self {
            ErrorDetail::ActivityError(e) => &e.description,
            ErrorDetail::RunError(e) => &e.description,
            ErrorDetail::BpmnError(e) => &e.name,
        }
    }

    /// Error code, when the payload carries a coded business error
    pub fn code(&self) -> Option<&str> {
        match self {
            ErrorDetail::ActivityError(e) => {
                e.inner.as_ref().and_then(|b| b.code.as_deref())
            }
            ErrorDetail::RunError(_) => None,
            ErrorDetail::BpmnError(e) => e.code.as_deref(),
        }
    }
}

impl From<ActivityError> for ErrorDetail {
    fn from(e: ActivityError) -> Self {
        ErrorDetail::ActivityError(e)
    }
}

impl From<RunError> for ErrorDetail {
    fn from(e: RunError) -> Self {
        ErrorDetail::RunError(e)
    }
}

impl From<BpmnError> for ErrorDetail {
    fn from(e: BpmnError) -> Self {
        ErrorDetail::BpmnError(e)
    }
}

impl std::fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorDetail::ActivityError(e) => e.fmt(f),
            ErrorDetail::RunError(e) => e.fmt(f),
            ErrorDetail::BpmnError(e) => e.fmt(f),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
