// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Element behaviors
//!
//! Every element type maps onto one variant of the closed [`Behaviour`] set,
//! dispatched through a single `execute` contract. An [`ActivityExecution`]
//! wraps the behavior with the bookkeeping that outlives one call: the wait
//! it is suspended on, multi-instance loop progress, and a nested sub-process
//! scope.

use crate::api::{ApiMessage, CatchTrigger};
use crate::error::EngineError;
use crate::eventdef::{self, ThrowOutcome, Wait};
use crate::scope::ScopeExecution;
use crate::state::ExecutionState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;
use weir_core::error::ErrorDetail;
use weir_core::expression::is_truthy;
use weir_core::{
    ActivityError, Content, ElementDefinition, ElementType, Environment, ProcessGraph, RunError,
};

/// Terminal result of a behavior
#[derive(Debug, Clone, PartialEq)]
pub enum Terminal {
    Completed(Option<Value>),
    Errored(ErrorDetail),
    Discarded,
    /// Terminate end event: complete, then terminate the owning process
    Terminated,
}

/// One round of behavior execution
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outcome {
    /// `None` means the behavior is suspended on a wait
    pub terminal: Option<Terminal>,
    /// Events for the owning scope to publish (throws, call requests)
    pub events: Vec<(String, Content)>,
}

impl Outcome {
    fn completed(output: Option<Value>) -> Self {
        Self {
            terminal: Some(Terminal::Completed(output)),
            events: Vec::new(),
        }
    }

    fn errored(detail: impl Into<ErrorDetail>) -> Self {
        Self {
            terminal: Some(Terminal::Errored(detail.into())),
            events: Vec::new(),
        }
    }

    fn waiting() -> Self {
        Self::default()
    }
}

/// Closed set of element behaviors
pub enum Behaviour {
    Task,
    ServiceTask,
    UserTask,
    ReceiveTask,
    /// Join/split logic lives in the activity; the gateway itself is a no-op
    Gateway,
    StartEvent,
    CatchEvent,
    ThrowEvent,
    SubProcess(Option<Box<ScopeExecution>>),
    CallActivity,
}

impl Behaviour {
    pub fn for_element(def: &ElementDefinition) -> Self {
        match def.kind {
            ElementType::ServiceTask => Behaviour::ServiceTask,
            ElementType::UserTask => Behaviour::UserTask,
            ElementType::ReceiveTask => Behaviour::ReceiveTask,
            ElementType::ExclusiveGateway
            | ElementType::InclusiveGateway
            | ElementType::ParallelGateway => Behaviour::Gateway,
            ElementType::StartEvent => Behaviour::StartEvent,
            ElementType::IntermediateCatchEvent | ElementType::BoundaryEvent => {
                Behaviour::CatchEvent
            }
            ElementType::IntermediateThrowEvent => Behaviour::ThrowEvent,
            ElementType::EndEvent => {
                if def.event_definitions.is_empty() {
                    Behaviour::Task
                } else {
                    Behaviour::ThrowEvent
                }
            }
            ElementType::SubProcess => Behaviour::SubProcess(None),
            ElementType::CallActivity => Behaviour::CallActivity,
            _ => Behaviour::Task,
        }
    }
}

/// Multi-instance loop progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LoopState {
    pub sequential: bool,
    pub items: Vec<Value>,
    /// Next item index to start
    pub next: usize,
    pub outputs: Vec<Value>,
    /// Started but not yet completed item indexes
    pub pending: Vec<usize>,
}

/// One element's nested execution, created fresh per run
pub struct ActivityExecution {
    behaviour: Behaviour,
    wait: Option<Wait>,
    loop_state: Option<LoopState>,
    completed: bool,
}

impl ActivityExecution {
    pub fn new(def: &ElementDefinition) -> Self {
        Self {
            behaviour: Behaviour::for_element(def),
            wait: None,
            loop_state: None,
            completed: false,
        }
    }

    pub fn wait(&self) -> Option<&Wait> {
        self.wait.as_ref()
    }

    pub fn is_waiting(&self) -> bool {
        self.wait.is_some() && !self.completed
    }

    /// Run the behavior. `None` terminal means it suspended on a wait.
    pub fn execute(
        &mut self,
        def: &ElementDefinition,
        content: &Content,
        environment: &Environment,
        graph: &dyn ProcessGraph,
    ) -> Result<Outcome, EngineError> {
        if def.loop_characteristics.is_some() {
            if self.loop_state.is_none() {
                self.loop_state = Some(init_loop(def, content, environment)?);
            }
            return self.advance_loop(def, content, environment, graph, None);
        }
        let outcome = self.execute_inner(def, content, environment, graph)?;
        if outcome.terminal.is_some() {
            self.completed = true;
            self.wait = None;
        }
        Ok(outcome)
    }

    /// Re-arm a recovered or resumed wait without re-running side effects
    pub fn resume(
        &mut self,
        def: &ElementDefinition,
        content: &Content,
        environment: &Environment,
        graph: &dyn ProcessGraph,
    ) -> Result<Outcome, EngineError> {
        match &mut self.behaviour {
            Behaviour::SubProcess(Some(scope)) => {
                scope.resume(graph)?;
                let events = scope.take_events();
                let mut outcome = evaluate_scope(scope);
                let mut all = events;
                all.extend(std::mem::take(&mut outcome.events));
                outcome.events = all;
                if outcome.terminal.is_some() {
                    self.completed = true;
                }
                Ok(outcome)
            }
            Behaviour::CatchEvent | Behaviour::StartEvent => {
                // Timers were cleared on stop; register them again.
                self.wait = Some(eventdef::execute_catching(
                    &def.event_definitions,
                    content,
                    environment,
                ));
                Ok(Outcome::waiting())
            }
            _ if self.wait.is_some() => Ok(Outcome::waiting()),
            _ => self.execute(def, content, environment, graph),
        }
    }

    fn execute_inner(
        &mut self,
        def: &ElementDefinition,
        content: &Content,
        environment: &Environment,
        graph: &dyn ProcessGraph,
    ) -> Result<Outcome, EngineError> {
        match &mut self.behaviour {
            Behaviour::Task | Behaviour::Gateway => Ok(Outcome::completed(content.message.clone())),
            Behaviour::ServiceTask => execute_service(def, content, environment),
            Behaviour::UserTask => {
                self.wait = Some(Wait::user());
                Ok(Outcome::waiting())
            }
            Behaviour::ReceiveTask => {
                self.wait = Some(Wait {
                    specs: vec![weir_core::EventDefinitionSpec::Message {
                        message_ref: def.behaviour_str("messageRef").map(str::to_string),
                    }],
                    ..Wait::default()
                });
                Ok(Outcome::waiting())
            }
            Behaviour::StartEvent => {
                if def.event_definitions.is_empty() || content.extra_bool("triggered") {
                    // Plain start, or an event start already holding its trigger.
                    return Ok(Outcome::completed(content.message.clone()));
                }
                self.wait = Some(eventdef::execute_catching(
                    &def.event_definitions,
                    content,
                    environment,
                ));
                Ok(Outcome::waiting())
            }
            Behaviour::CatchEvent => {
                let wait = if def.event_definitions.is_empty() {
                    Wait::user()
                } else {
                    eventdef::execute_catching(&def.event_definitions, content, environment)
                };
                self.wait = Some(wait);
                Ok(Outcome::waiting())
            }
            Behaviour::ThrowEvent => match eventdef::execute_throwing(&def.event_definitions, content) {
                ThrowOutcome::Completed => Ok(Outcome::completed(content.message.clone())),
                ThrowOutcome::Error(err) => Ok(Outcome::errored(err)),
                ThrowOutcome::Terminate => Ok(Outcome {
                    terminal: Some(Terminal::Terminated),
                    events: Vec::new(),
                }),
                ThrowOutcome::Thrown(events) => {
                    let events = events
                        .into_iter()
                        .map(|thrown| {
                            let mut event = content.clone();
                            event.extra.insert(
                                "eventKind".to_string(),
                                Value::String(thrown.kind.to_string()),
                            );
                            if let Some(reference) = thrown.reference {
                                event
                                    .extra
                                    .insert("reference".to_string(), Value::String(reference));
                            }
                            if thrown.delegate {
                                event.extra.insert("delegate".to_string(), Value::Bool(true));
                            }
                            (thrown.routing_key.to_string(), event)
                        })
                        .collect();
                    Ok(Outcome {
                        terminal: Some(Terminal::Completed(content.message.clone())),
                        events,
                    })
                }
            },
            Behaviour::SubProcess(slot) => {
                if slot.is_none() {
                    let scoped = environment.scoped(BTreeMap::new());
                    let mut scope = ScopeExecution::new(
                        &def.id,
                        def.kind.name(),
                        &content.execution_id,
                        scoped,
                        graph,
                    );
                    scope.run(graph, None, content.message.clone(), false)?;
                    *slot = Some(Box::new(scope));
                }
                let Some(scope) = slot.as_mut() else {
                    return Ok(Outcome::waiting());
                };
                scope.drain(graph)?;
                let events = scope.take_events();
                let mut outcome = evaluate_scope(scope);
                let mut all = events;
                all.extend(std::mem::take(&mut outcome.events));
                outcome.events = all;
                if outcome.terminal.is_none() {
                    self.wait = Some(Wait::api());
                }
                Ok(outcome)
            }
            Behaviour::CallActivity => {
                let mut call = content.clone();
                if let Some(called) = def.behaviour_str("calledElement") {
                    call.extra
                        .insert("calledElement".to_string(), Value::String(called.to_string()));
                }
                self.wait = Some(Wait::api());
                Ok(Outcome {
                    terminal: None,
                    events: vec![("activity.call".to_string(), call)],
                })
            }
        }
    }

    /// Offer a trigger to the wait; `None` means it was not for us.
    pub fn signal(
        &mut self,
        def: &ElementDefinition,
        target: &ApiMessage,
        trigger: &CatchTrigger,
        payload: Option<Value>,
        content: &Content,
        environment: &Environment,
        graph: &dyn ProcessGraph,
    ) -> Result<Option<Outcome>, EngineError> {
        let addressed_here = target.is_broadcast()
            || target.id.as_deref() == Some(def.id.as_str())
            || target.execution_id.as_deref() == Some(content.execution_id.as_str());
        if self.loop_state.is_some() {
            let matched =
                addressed_here && self.wait.as_ref().is_some_and(|w| w.matches(trigger));
            if !matched {
                return Ok(None);
            }
            return self
                .advance_loop(def, content, environment, graph, Some(payload))
                .map(Some);
        }
        if let Some(wait) = &self.wait {
            if addressed_here && wait.matches(trigger) {
                debug!(element = %def.id, "wait completed");
                for timer_id in &wait.timer_ids {
                    environment.timers.clear_timeout(timer_id);
                }
                self.wait = None;
                self.completed = true;
                return Ok(Some(Outcome::completed(payload)));
            }
        }
        // Not addressed to this element: maybe to something nested in it.
        if let Behaviour::SubProcess(Some(scope)) = &mut self.behaviour {
            if scope.deliver(target, trigger, payload, graph)? {
                scope.drain(graph)?;
                let events = scope.take_events();
                let mut outcome = evaluate_scope(scope);
                let mut all = events;
                all.extend(std::mem::take(&mut outcome.events));
                outcome.events = all;
                if outcome.terminal.is_some() {
                    self.completed = true;
                    self.wait = None;
                }
                return Ok(Some(outcome));
            }
        }
        Ok(None)
    }

    /// Would a trigger addressed like this land here (or inside here)?
    pub fn contains_target(&self, target: &ApiMessage) -> bool {
        match &self.behaviour {
            Behaviour::SubProcess(Some(scope)) => scope.contains_target(target),
            _ => false,
        }
    }

    /// Freeze nested work
    pub fn stop(&mut self, environment: &Environment) {
        if let Some(wait) = &self.wait {
            for timer_id in &wait.timer_ids {
                environment.timers.clear_timeout(timer_id);
            }
        }
        if let Behaviour::SubProcess(Some(scope)) = &mut self.behaviour {
            scope.stop(environment);
        }
    }

    fn advance_loop(
        &mut self,
        def: &ElementDefinition,
        content: &Content,
        environment: &Environment,
        graph: &dyn ProcessGraph,
        completion: Option<Option<Value>>,
    ) -> Result<Outcome, EngineError> {
        let Some(mut state) = self.loop_state.take() else {
            return Ok(Outcome::waiting());
        };
        let batch = environment.settings.batch_size.max(1);
        let mut events = Vec::new();

        if let Some(payload) = completion {
            if let Some(index) = state.pending.first().copied() {
                state.pending.remove(0);
                state
                    .outputs
                    .push(payload.unwrap_or(Value::Null));
                debug!(element = %def.id, index, "iteration completed");
            }
            self.wait = None;
        }

        // Start iterations until done, suspended, or at the batch cap.
        loop {
            if loop_done(&state, def, content, environment)? && state.pending.is_empty() {
                self.loop_state = Some(state);
                self.completed = true;
                let outputs = self
                    .loop_state
                    .as_ref()
                    .map(|s| Value::Array(s.outputs.clone()));
                return Ok(Outcome {
                    terminal: Some(Terminal::Completed(outputs)),
                    events,
                });
            }
            if loop_done(&state, def, content, environment)? {
                // All started; waiting for pending iterations.
                break;
            }
            if !state.sequential && state.pending.len() >= batch {
                break;
            }
            if state.sequential && !state.pending.is_empty() {
                break;
            }

            let index = state.next;
            state.next += 1;
            let iteration = iteration_content(content, &state.items[index], index);
            let mut inner = ActivityExecution {
                behaviour: Behaviour::for_element(def),
                wait: None,
                loop_state: None,
                completed: false,
            };
            let outcome = inner.execute_inner(def, &iteration, environment, graph)?;
            events.extend(outcome.events);
            match outcome.terminal {
                Some(Terminal::Completed(output)) => {
                    state.outputs.push(output.unwrap_or(Value::Null));
                }
                Some(Terminal::Errored(detail)) => {
                    self.loop_state = Some(state);
                    return Ok(Outcome {
                        terminal: Some(Terminal::Errored(detail)),
                        events,
                    });
                }
                Some(other) => {
                    self.loop_state = Some(state);
                    return Ok(Outcome {
                        terminal: Some(other),
                        events,
                    });
                }
                None => {
                    state.pending.push(index);
                    self.wait = inner.wait;
                }
            }
        }

        self.loop_state = Some(state);
        Ok(Outcome {
            terminal: None,
            events,
        })
    }

    pub fn state(&self) -> ExecutionState {
        ExecutionState {
            completed: self.completed,
            wait: self.wait.clone(),
            scope: match &self.behaviour {
                Behaviour::SubProcess(Some(scope)) => Some(Box::new(scope.state())),
                _ => None,
            },
            loop_state: self.loop_state.clone(),
        }
    }

    pub fn recover(
        def: &ElementDefinition,
        state: &ExecutionState,
        environment: &Environment,
        graph: &dyn ProcessGraph,
    ) -> Self {
        let behaviour = match (Behaviour::for_element(def), &state.scope) {
            (Behaviour::SubProcess(_), Some(scope_state)) => {
                let scoped = environment.recover(scope_state.environment.clone());
                Behaviour::SubProcess(Some(Box::new(ScopeExecution::recover(
                    &def.id,
                    def.kind.name(),
                    scope_state,
                    scoped,
                    graph,
                ))))
            }
            (behaviour, _) => behaviour,
        };
        Self {
            behaviour,
            wait: state.wait.clone(),
            loop_state: state.loop_state.clone(),
            completed: state.completed,
        }
    }
}

fn evaluate_scope(scope: &ScopeExecution) -> Outcome {
    if let Some(error) = scope.error() {
        Outcome::errored(error.clone())
    } else if scope.is_completed() {
        Outcome::completed(None)
    } else {
        Outcome::waiting()
    }
}

fn execute_service(
    def: &ElementDefinition,
    content: &Content,
    environment: &Environment,
) -> Result<Outcome, EngineError> {
    let Some(name) = def.behaviour_str("service") else {
        return missing_service(def, environment, "no service configured");
    };
    let resolved = if weir_core::expression::is_expression(name) {
        match environment.resolve_expression(name, content) {
            Ok(Value::String(s)) => s,
            Ok(_) | Err(_) => name.to_string(),
        }
    } else {
        name.to_string()
    };
    let Some(service) = environment.get_service(&resolved) else {
        return missing_service(def, environment, &format!("service <{resolved}> not found"));
    };
    let input = serde_json::to_value(content).map_err(|e| {
        EngineError::Activity(ActivityError::new(&def.id, e.to_string()))
    })?;
    match service(&input) {
        Ok(output) => Ok(Outcome::completed(Some(output))),
        Err(err) => Ok(Outcome::errored(
            ActivityError::new(&def.id, err.to_string())
                .with_execution(content.execution_id.clone())
                .with_inner(err),
        )),
    }
}

fn missing_service(
    def: &ElementDefinition,
    environment: &Environment,
    description: &str,
) -> Result<Outcome, EngineError> {
    if environment.settings.enable_dummy_service {
        return Ok(Outcome::completed(None));
    }
    Ok(Outcome::errored(ActivityError::new(&def.id, description)))
}

fn init_loop(
    def: &ElementDefinition,
    content: &Content,
    environment: &Environment,
) -> Result<LoopState, EngineError> {
    let Some(lc) = &def.loop_characteristics else {
        return Err(EngineError::Run(RunError::new(format!(
            "element <{}> has no loop characteristics",
            def.id
        ))));
    };
    let items = if let Some(collection) = &lc.collection {
        match environment.resolve_expression(collection, content)? {
            Value::Array(items) => items,
            other => {
                return Err(EngineError::Run(RunError::new(format!(
                    "collection on <{}> resolved to {other}, expected an array",
                    def.id
                ))))
            }
        }
    } else if let Some(cardinality) = &lc.cardinality {
        let count = if weir_core::expression::is_expression(cardinality) {
            environment
                .resolve_expression(cardinality, content)?
                .as_u64()
        } else {
            cardinality.parse::<u64>().ok()
        };
        let Some(count) = count else {
            return Err(EngineError::Run(RunError::new(format!(
                "cardinality on <{}> did not resolve to a number",
                def.id
            ))));
        };
        (0..count).map(Value::from).collect()
    } else {
        return Err(EngineError::Run(RunError::new(format!(
            "loop on <{}> needs a cardinality or a collection",
            def.id
        ))));
    };
    Ok(LoopState {
        sequential: lc.is_sequential,
        items,
        next: 0,
        outputs: Vec::new(),
        pending: Vec::new(),
    })
}

fn loop_done(
    state: &LoopState,
    def: &ElementDefinition,
    content: &Content,
    environment: &Environment,
) -> Result<bool, EngineError> {
    if state.next >= state.items.len() {
        return Ok(true);
    }
    let Some(condition) = def
        .loop_characteristics
        .as_ref()
        .and_then(|lc| lc.completion_condition.as_ref())
    else {
        return Ok(false);
    };
    if state.outputs.is_empty() {
        return Ok(false);
    }
    let mut scope = content.clone();
    scope
        .extra
        .insert("outputs".to_string(), Value::Array(state.outputs.clone()));
    let value = environment.resolve_expression(condition, &scope)?;
    Ok(is_truthy(&value))
}

fn iteration_content(content: &Content, item: &Value, index: usize) -> Content {
    let mut iteration = content.clone();
    iteration.extra.insert("item".to_string(), item.clone());
    iteration
        .extra
        .insert("index".to_string(), Value::from(index as u64));
    iteration
}

#[cfg(test)]
#[path = "behaviour_tests.rs"]
mod tests;
