// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;
use weir_broker::BrokerError;
use weir_core::error::{ActivityError, BpmnError, ErrorDetail, RunError};
use weir_core::expression::ExpressionError;

/// Engine-level error surfaced from the definition facade
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Broker(#[from] BrokerError),
    #[error(transparent)]
    Activity(#[from] ActivityError),
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Bpmn(#[from] BpmnError),
    #[error("unknown element {0}")]
    UnknownElement(String),
    #[error("unknown process {0}")]
    UnknownProcess(String),
}

impl From<ExpressionError> for EngineError {
    fn from(e: ExpressionError) -> Self {
        EngineError::Run(RunError {
            description: e.to_string(),
            source_id: Some(e.expression),
        })
    }
}

impl From<ErrorDetail> for EngineError {
    fn from(detail: ErrorDetail) -> Self {
        match detail {
            ErrorDetail::ActivityError(e) => EngineError::Activity(e),
            ErrorDetail::RunError(e) => EngineError::Run(e),
            ErrorDetail::BpmnError(e) => EngineError::Bpmn(e),
        }
    }
}
