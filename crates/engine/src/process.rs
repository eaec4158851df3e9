// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process instance: one run of an executable process definition
//!
//! Thin wrapper over [`ScopeExecution`] that adds the process lifecycle
//! events, the finished-run counters and the status derived from how the
//! scope ended.

use crate::activity::{Extensions, Status};
use crate::api::{ApiMessage, CatchTrigger};
use crate::error::EngineError;
use crate::scope::ScopeExecution;
use crate::state::ProcessState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use weir_core::error::ErrorDetail;
use weir_core::{Content, Environment, ProcessDefinition, ProcessGraph, StartFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessCounters {
    pub completed: usize,
    pub discarded: usize,
    pub terminated: usize,
}

pub struct ProcessInstance {
    def: ProcessDefinition,
    status: Status,
    pub counters: ProcessCounters,
    scope: ScopeExecution,
    pending: Vec<(String, Content)>,
    left: bool,
}

impl ProcessInstance {
    pub fn new(
        def: &ProcessDefinition,
        environment: Environment,
        extensions: Extensions,
        graph: &dyn ProcessGraph,
    ) -> Self {
        let execution_id = environment.next_execution_id(&def.id);
        let scope = ScopeExecution::new(&def.id, "process", &execution_id, environment, graph)
            .with_extensions(extensions);
        Self {
            def: def.clone(),
            status: Status::Init,
            counters: ProcessCounters::default(),
            scope,
            pending: Vec::new(),
            left: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn execution_id(&self) -> &str {
        self.scope.execution_id()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, Status::Entered | Status::Start | Status::Executing)
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            Status::End | Status::Discarded | Status::Errored | Status::Terminated
        )
    }

    pub fn error(&self) -> Option<&ErrorDetail> {
        self.scope.error()
    }

    fn lifecycle_content(&self) -> Content {
        let mut content = Content::for_element(&self.def.id, "process");
        content.execution_id = self.execution_id().to_string();
        content
    }

    pub fn run(
        &mut self,
        graph: &dyn ProcessGraph,
        filter: Option<StartFilter>,
        trigger: Option<Value>,
        triggered: bool,
    ) -> Result<(), EngineError> {
        debug!(process = %self.def.id, execution = %self.execution_id(), "run");
        self.status = Status::Entered;
        self.pending
            .push(("process.enter".to_string(), self.lifecycle_content()));
        self.status = Status::Start;
        self.pending
            .push(("process.start".to_string(), self.lifecycle_content()));
        self.scope.run(graph, filter, trigger, triggered)?;
        self.status = Status::Executing;
        Ok(())
    }

    /// Drain the scope and return everything that happened, parent-stamped
    pub fn drain(
        &mut self,
        graph: &dyn ProcessGraph,
    ) -> Result<Vec<(String, Content)>, EngineError> {
        self.scope.drain(graph)?;
        let mut events = std::mem::take(&mut self.pending);
        events.extend(self.scope.take_events());
        if let Some(detail) = self.scope.error() {
            if self.status != Status::Errored {
                self.status = Status::Errored;
                let mut content = self.lifecycle_content();
                content.error = Some(detail.clone());
                events.push(("process.error".to_string(), content));
            }
        } else if self.scope.is_completed() && !self.left {
            self.left = true;
            if self.scope.is_terminated() {
                self.status = Status::Terminated;
                self.counters.terminated += 1;
            } else {
                self.status = Status::End;
                self.counters.completed += 1;
            }
            let mut content = self.lifecycle_content();
            if let Ok(counters) = serde_json::to_value(self.counters) {
                content.extra.insert("counters".to_string(), counters);
            }
            debug!(process = %self.def.id, status = ?self.status, "leave");
            events.push(("process.leave".to_string(), content));
        }
        Ok(events)
    }

    pub fn deliver(
        &mut self,
        target: &ApiMessage,
        trigger: &CatchTrigger,
        payload: Option<Value>,
        graph: &dyn ProcessGraph,
    ) -> Result<bool, EngineError> {
        self.scope.deliver(target, trigger, payload, graph)
    }

    pub fn contains_target(&self, target: &ApiMessage) -> bool {
        self.scope.contains_target(target)
    }

    /// Discard an addressed running activity; true when one was found
    pub fn cancel(&mut self, target: &ApiMessage) -> bool {
        self.scope.cancel(target)
    }

    pub fn stop(&mut self, environment: &Environment) {
        if self.is_running() {
            self.scope.stop(environment);
        }
    }

    /// Stop a called instance whose caller went away
    pub fn discard(&mut self, environment: &Environment) {
        if self.is_running() {
            self.scope.stop(environment);
            self.status = Status::Discarded;
            self.counters.discarded += 1;
        }
    }

    pub fn resume(&mut self, graph: &dyn ProcessGraph) -> Result<(), EngineError> {
        if !self.is_finished() {
            self.scope.resume(graph)?;
        }
        Ok(())
    }

    pub fn get_postponed(&self) -> Vec<Content> {
        self.scope.get_postponed()
    }

    pub fn state(&self) -> ProcessState {
        ProcessState {
            id: self.def.id.clone(),
            status: self.status,
            counters: self.counters,
            scope: self.scope.state(),
        }
    }

    pub fn recover(
        def: &ProcessDefinition,
        state: &ProcessState,
        environment: Environment,
        extensions: Extensions,
        graph: &dyn ProcessGraph,
    ) -> Self {
        let scoped = environment.recover(state.scope.environment.clone());
        let scope = ScopeExecution::recover(&def.id, "process", &state.scope, scoped, graph)
            .with_extensions(Arc::clone(&extensions));
        Self {
            def: def.clone(),
            status: state.status,
            counters: state.counters,
            scope,
            pending: Vec::new(),
            left: state.scope.completed,
        }
    }
}
