// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared execution environment
//!
//! Variables, settings, services, expressions and timers are shared by
//! reference down an execution scope. `scoped()` deep-copies the variables so
//! a sub-scope (sub-process, multi-instance iteration, call activity) cannot
//! mutate the parent's; everything else stays shared. Cloning variables is
//! the sole mutation-isolation mechanism; there are no locks to contend
//! because execution is single-threaded.

use crate::clock::{Clock, SystemClock};
use crate::error::BpmnError;
use crate::expression::{ExpressionError, ExpressionEvaluator, MinijinjaEvaluator};
use crate::id::{execution_id, IdGen, UuidIdGen};
use crate::message::Content;
use crate::timers::Timers;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A host-registered service callable from service tasks
pub type Service = Arc<dyn Fn(&Value) -> Result<Value, BpmnError> + Send + Sync>;

/// Engine feature flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Pause after every state transition (host steps the engine manually)
    pub step: bool,
    /// Treat unresolved services and conditions as errors
    pub strict: bool,
    /// Leave state broadcasts out of snapshots to keep them small
    pub disable_track_state: bool,
    /// Parallel multi-instance iterations started per batch
    pub batch_size: usize,
    /// Resolve missing services to a no-op instead of failing
    pub enable_dummy_service: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            step: false,
            strict: false,
            disable_track_state: false,
            batch_size: 50,
            enable_dummy_service: true,
        }
    }
}

/// Serializable environment snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentState {
    pub variables: BTreeMap<String, Value>,
    pub settings: Settings,
}

/// Shared execution environment
#[derive(Clone)]
pub struct Environment {
    variables: Arc<Mutex<BTreeMap<String, Value>>>,
    pub settings: Settings,
    services: Arc<Mutex<BTreeMap<String, Service>>>,
    expressions: Arc<dyn ExpressionEvaluator>,
    pub timers: Timers,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGen>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            variables: Arc::new(Mutex::new(BTreeMap::new())),
            settings: Settings::default(),
            services: Arc::new(Mutex::new(BTreeMap::new())),
            expressions: Arc::new(MinijinjaEvaluator),
            timers: Timers::new(),
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidIdGen),
        }
    }

    pub fn with_variables(self, variables: BTreeMap<String, Value>) -> Self {
        Self {
            variables: Arc::new(Mutex::new(variables)),
            ..self
        }
    }

    pub fn with_settings(self, settings: Settings) -> Self {
        Self { settings, ..self }
    }

    pub fn with_service(
        self,
        name: impl Into<String>,
        service: impl Fn(&Value) -> Result<Value, BpmnError> + Send + Sync + 'static,
    ) -> Self {
        self.services
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), Arc::new(service));
        self
    }

    pub fn with_expressions(self, expressions: Arc<dyn ExpressionEvaluator>) -> Self {
        Self {
            expressions,
            ..self
        }
    }

    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self { clock, ..self }
    }

    pub fn with_ids(self, ids: Arc<dyn IdGen>) -> Self {
        Self { ids, ..self }
    }

    /// Fork for a sub-scope: variables are copied, everything else shared
    pub fn scoped(&self, extra: BTreeMap<String, Value>) -> Self {
        let mut variables = self.variables();
        variables.extend(extra);
        Self {
            variables: Arc::new(Mutex::new(variables)),
            settings: self.settings,
            services: Arc::clone(&self.services),
            expressions: Arc::clone(&self.expressions),
            timers: self.timers.clone(),
            clock: Arc::clone(&self.clock),
            ids: Arc::clone(&self.ids),
        }
    }

    pub fn variables(&self) -> BTreeMap<String, Value> {
        self.variables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_variable(&self, name: impl Into<String>, value: Value) {
        self.variables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), value);
    }

    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.variables
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    pub fn get_service(&self, name: &str) -> Option<Service> {
        self.services
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Evaluate an expression against `{variables, content}`
    pub fn resolve_expression(
        &self,
        expression: &str,
        message: &Content,
    ) -> Result<Value, ExpressionError> {
        let scope = serde_json::json!({
            "variables": self.variables(),
            "content": message,
        });
        self.expressions.evaluate(expression, &scope)
    }

    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Mint a fresh execution id for an element
    pub fn next_execution_id(&self, element_id: &str) -> String {
        execution_id(element_id, self.ids.as_ref())
    }

    pub fn state(&self) -> EnvironmentState {
        EnvironmentState {
            variables: self.variables(),
            settings: self.settings,
        }
    }

    /// Rebuild an environment from a snapshot, keeping this one's seams
    /// (services, expressions, clock, ids, timers)
    pub fn recover(&self, state: EnvironmentState) -> Self {
        Self {
            variables: Arc::new(Mutex::new(state.variables)),
            settings: state.settings,
            services: Arc::clone(&self.services),
            expressions: Arc::clone(&self.expressions),
            timers: self.timers.clone(),
            clock: Arc::clone(&self.clock),
            ids: Arc::clone(&self.ids),
        }
    }
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;
