// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! weir-engine: layered execution coordinators for the weir process engine
//!
//! Execution is layered: a [`Definition`] owns one or more process
//! instances, each process owns its activities and sequence flows, and each
//! activity owns a run-to-completion state machine driven by its own
//! [`weir_broker::Broker`]. Layers communicate by draining each other's
//! event queues in deterministic FIFO order; there is no preemption.
//!
//! Suspension is an unacknowledged `run.execute` message: a waiting user
//! task, catch event or sub-process leaves that message in flight, and both
//! live resumption (signal, timer) and crash recovery (snapshot, redelivery)
//! drive the exact same handler paths.

pub mod activity;
pub mod api;
pub mod behaviour;
pub mod definition;
pub mod error;
pub mod eventdef;
pub mod flow;
pub mod outbound;
pub mod process;
pub mod scope;
pub mod shake;
pub mod state;

pub use activity::{Activity, ActivityCounters, Extension, Extensions, Status};
pub use api::{ApiMessage, CatchTrigger};
pub use behaviour::{ActivityExecution, Behaviour, Outcome, Terminal};
pub use definition::Definition;
pub use error::EngineError;
pub use eventdef::Wait;
pub use flow::{FlowCounters, SequenceFlow};
pub use outbound::evaluate_outbound;
pub use process::{ProcessCounters, ProcessInstance};
pub use shake::{shake, ShakeRun};
pub use state::{
    ActivityState, CallBindingState, DefinitionState, ExecutionState, FlowState, ProcessState,
    ScopeState,
};
