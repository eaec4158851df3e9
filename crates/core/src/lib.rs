// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! weir-core: shared model for the weir process engine
//!
//! This crate provides:
//! - Immutable element definitions and the `ProcessGraph` collaborator trait
//! - The shared `Environment` (variables, settings, services, expressions, timers)
//! - The message envelope routed by the broker (`Content`, `Parent`, `FlowAction`)
//! - Error kinds carried through messages and snapshots

pub mod clock;
pub mod element;
pub mod environment;
pub mod error;
pub mod expression;
pub mod graph;
pub mod id;
pub mod message;
pub mod timers;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use element::{
    AssociationDefinition, DataObjectDefinition, ElementDefinition, ElementType,
    EventDefinitionSpec, LoopCharacteristics, MessageFlowDefinition, ProcessDefinition,
    SequenceFlowDefinition,
};
pub use environment::{Environment, EnvironmentState, Service, Settings};
pub use error::{ActivityError, BpmnError, ErrorDetail, RunError};
pub use expression::{ExpressionError, ExpressionEvaluator, MinijinjaEvaluator};
pub use graph::{Graph, GraphBuilder, ProcessGraph, StartFilter};
pub use id::{execution_id, IdGen, SequentialIdGen, UuidIdGen};
pub use message::{Content, FlowAction, FlowActionKind, Parent};
pub use timers::{RegisteredTimer, Timers};
