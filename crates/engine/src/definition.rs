// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Definition execution: the host-facing facade
//!
//! Owns the process instances of one definition, forwards every child event
//! onto its own broker for observers, conveys message flows between
//! processes, broadcasts uncaught signals, materializes call activities as
//! fresh instances and binds their completion back to the caller. An error
//! nothing catches fails the run loudly.

use crate::activity::{Extension, Extensions, Status};
use crate::api::{ApiMessage, CatchTrigger};
use crate::error::EngineError;
use crate::process::ProcessInstance;
use crate::shake::{self, ShakeRun};
use crate::state::{CallBindingState, DefinitionState};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use weir_broker::{Broker, ConsumeOptions, ExchangeType, Publish, QueueOptions};
use weir_core::error::ErrorDetail;
use weir_core::{Content, Environment, Parent, ProcessGraph, StartFilter};

/// Caller/callee binding of a running call activity
struct CallBinding {
    caller_execution_id: String,
    called_index: usize,
}

pub struct Definition {
    id: String,
    graph: Arc<dyn ProcessGraph>,
    environment: Environment,
    extensions: Extensions,
    broker: Broker,
    processes: Vec<ProcessInstance>,
    calls: Vec<CallBinding>,
    execution_id: Option<String>,
    status: Status,
    stopped: bool,
    completed: bool,
    failure: Option<ErrorDetail>,
}

impl Definition {
    pub fn new(
        id: impl Into<String>,
        graph: Arc<dyn ProcessGraph>,
        environment: Environment,
    ) -> Self {
        let mut broker = Broker::new();
        broker.assert_exchange("event", ExchangeType::Topic, true);
        broker.assert_queue(
            "events-q",
            QueueOptions {
                durable: false,
                auto_delete: false,
            },
        );
        let _ = broker.bind_queue("events-q", "event", "#", 0);
        let _ = broker.consume("events-q", ConsumeOptions::tagged("_events").with_no_ack());
        Self {
            id: id.into(),
            graph,
            environment,
            extensions: Arc::new(Vec::new()),
            broker,
            processes: Vec::new(),
            calls: Vec::new(),
            execution_id: None,
            status: Status::Undefined,
            stopped: false,
            completed: false,
            failure: None,
        }
    }

    pub fn with_extension(mut self, extension: Arc<dyn Extension>) -> Self {
        let mut extensions: Vec<Arc<dyn Extension>> = self.extensions.as_ref().clone();
        extensions.push(extension);
        self.extensions = Arc::new(extensions);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn execution_id(&self) -> Option<&str> {
        self.execution_id.as_deref()
    }

    /// Run every executable process to quiescence.
    ///
    /// An error no boundary or catch event handled fails the whole run.
    pub fn run(&mut self) -> Result<(), EngineError> {
        if self.processes.iter().any(ProcessInstance::is_running) {
            return Ok(());
        }
        let execution_id = self.environment.next_execution_id(&self.id);
        info!(definition = %self.id, execution = %execution_id, "run");
        self.execution_id = Some(execution_id);
        self.status = Status::Executing;
        let graph = Arc::clone(&self.graph);
        let defs: Vec<_> = graph
            .executable_processes()
            .into_iter()
            .cloned()
            .collect();
        for def in &defs {
            let mut instance = ProcessInstance::new(
                def,
                self.environment.clone(),
                Arc::clone(&self.extensions),
                graph.as_ref(),
            );
            instance.run(graph.as_ref(), None, None, false)?;
            self.processes.push(instance);
        }
        self.drain()
    }

    /// Drive all instances until nothing moves; then settle status
    fn drain(&mut self) -> Result<(), EngineError> {
        if self.stopped {
            return Ok(());
        }
        let graph = Arc::clone(&self.graph);
        let mut progressed = true;
        while progressed {
            progressed = false;
            for index in 0..self.processes.len() {
                if self.stopped {
                    return Ok(());
                }
                let events = self.processes[index].drain(graph.as_ref())?;
                if events.is_empty() {
                    continue;
                }
                progressed = true;
                for (key, content) in events {
                    self.on_event(index, &key, content)?;
                }
            }
        }
        if let Some(detail) = self.failure.take() {
            self.status = Status::Errored;
            return Err(detail.into());
        }
        if let Some(detail) = self
            .processes
            .iter()
            .find_map(|p| p.error().cloned())
        {
            self.status = Status::Errored;
            return Err(detail.into());
        }
        if !self.processes.is_empty()
            && self.processes.iter().all(ProcessInstance::is_finished)
        {
            self.completed = true;
            self.status = Status::End;
            info!(definition = %self.id, "completed");
        }
        Ok(())
    }

    fn on_event(&mut self, index: usize, key: &str, mut content: Content) -> Result<(), EngineError> {
        let owner = Parent::new(
            &self.id,
            "definition",
            self.execution_id.clone().unwrap_or_default(),
        );
        content.parent = Some(Parent::shift(owner, content.parent.take()));

        match key {
            "activity.call" => self.spawn_called(&content)?,
            "process.leave" => self.settle_call(index, &content),
            "process.error" => {
                if self.calls.iter().any(|c| c.called_index == index) {
                    self.failure = content.error.clone();
                }
            }
            "activity.discarded" => {
                let callers: Vec<usize> = self
                    .calls
                    .iter()
                    .filter(|c| c.caller_execution_id == content.execution_id)
                    .map(|c| c.called_index)
                    .collect();
                if !callers.is_empty() {
                    let environment = self.environment.clone();
                    for called in callers {
                        debug!(definition = %self.id, "caller discarded, dropping called instance");
                        self.processes[called].discard(&environment);
                    }
                    self.calls
                        .retain(|c| c.caller_execution_id != content.execution_id);
                }
            }
            "activity.message" => self.convey_message(index, &content)?,
            "activity.signal" => self.broadcast_signal(index, &content)?,
            "activity.escalate" => {
                warn!(definition = %self.id, element = %content.id, "uncaught escalation");
            }
            _ => {}
        }
        // Error events must reach an observer queue; everything else is
        // best-effort fan-out.
        let publish = if content.error.is_some() {
            Publish::mandatory()
        } else {
            Publish::default()
        };
        self.broker.publish("event", key, content, publish)?;
        Ok(())
    }

    fn spawn_called(&mut self, content: &Content) -> Result<(), EngineError> {
        let Some(process_id) = content.extra.get("calledElement").and_then(Value::as_str) else {
            return Err(EngineError::UnknownProcess(content.id.clone()));
        };
        let graph = Arc::clone(&self.graph);
        let Some(def) = graph.process_by_id(process_id) else {
            return Err(EngineError::UnknownProcess(process_id.to_string()));
        };
        debug!(definition = %self.id, called = %process_id, caller = %content.id, "call");
        let mut instance = ProcessInstance::new(
            def,
            self.environment.scoped(Default::default()),
            Arc::clone(&self.extensions),
            graph.as_ref(),
        );
        instance.run(graph.as_ref(), None, content.message.clone(), true)?;
        self.calls.push(CallBinding {
            caller_execution_id: content.execution_id.clone(),
            called_index: self.processes.len(),
        });
        self.processes.push(instance);
        Ok(())
    }

    /// A process finished; if it was a called instance, complete its caller
    fn settle_call(&mut self, index: usize, content: &Content) {
        let Some(position) = self.calls.iter().position(|c| c.called_index == index) else {
            return;
        };
        let binding = self.calls.remove(position);
        let target = ApiMessage::for_execution(&binding.caller_execution_id);
        let payload = content.message.clone();
        let graph = Arc::clone(&self.graph);
        for process in &mut self.processes {
            if process.contains_target(&target) {
                let _ = process.deliver(&target, &CatchTrigger::Api, payload, graph.as_ref());
                break;
            }
        }
    }

    /// Convey a thrown message along its message flows
    fn convey_message(&mut self, index: usize, content: &Content) -> Result<(), EngineError> {
        let graph = Arc::clone(&self.graph);
        let source_process = self.processes[index].id().to_string();
        let reference = content
            .extra
            .get("reference")
            .and_then(Value::as_str)
            .map(str::to_string);
        let flows: Vec<_> = graph
            .message_flows(&source_process)
            .into_iter()
            .filter(|f| {
                f.source_activity_id.is_none()
                    || f.source_activity_id.as_deref() == Some(content.id.as_str())
            })
            .cloned()
            .collect();
        if flows.is_empty() {
            // No flow: a message is not broadcast, only offered to catchers.
            let trigger = CatchTrigger::Message {
                reference: reference.clone(),
            };
            let broadcast = ApiMessage::default();
            for (i, process) in self.processes.iter_mut().enumerate() {
                if i != index {
                    let _ = process.deliver(
                        &broadcast,
                        &trigger,
                        content.message.clone(),
                        graph.as_ref(),
                    );
                }
            }
            return Ok(());
        }
        for flow in flows {
            let trigger = CatchTrigger::Message {
                reference: reference.clone(),
            };
            let target = match &flow.target_activity_id {
                Some(activity_id) => ApiMessage::for_id(activity_id),
                None => ApiMessage::default(),
            };
            let mut delivered = false;
            for (i, process) in self.processes.iter_mut().enumerate() {
                if i == index || process.id() != flow.target_process_id {
                    continue;
                }
                if process.is_running()
                    && process.deliver(&target, &trigger, content.message.clone(), graph.as_ref())?
                {
                    delivered = true;
                }
            }
            if !delivered {
                self.start_lazy(
                    &flow.target_process_id,
                    StartFilter::event("message", reference.clone()),
                    content.message.clone(),
                )?;
            }
        }
        Ok(())
    }

    /// Offer an uncaught signal to every other process, or start one by it
    fn broadcast_signal(&mut self, index: usize, content: &Content) -> Result<(), EngineError> {
        let graph = Arc::clone(&self.graph);
        let reference = content
            .extra
            .get("reference")
            .and_then(Value::as_str)
            .map(str::to_string);
        let trigger = CatchTrigger::Signal {
            reference: reference.clone(),
        };
        let broadcast = ApiMessage::default();
        let mut caught = false;
        for (i, process) in self.processes.iter_mut().enumerate() {
            if i == index {
                continue;
            }
            if process.deliver(&broadcast, &trigger, content.message.clone(), graph.as_ref())? {
                caught = true;
            }
        }
        if !caught {
            let candidates: Vec<String> = graph
                .processes()
                .into_iter()
                .filter(|p| {
                    !graph
                        .start_activities(
                            &StartFilter::event("signal", reference.clone()),
                            &p.id,
                        )
                        .is_empty()
                })
                .map(|p| p.id.clone())
                .collect();
            for process_id in candidates {
                if self
                    .processes
                    .iter()
                    .any(|p| p.id() == process_id && p.is_running())
                {
                    continue;
                }
                self.start_lazy(
                    &process_id,
                    StartFilter::event("signal", reference.clone()),
                    content.message.clone(),
                )?;
            }
        }
        Ok(())
    }

    fn start_lazy(
        &mut self,
        process_id: &str,
        filter: StartFilter,
        trigger: Option<Value>,
    ) -> Result<(), EngineError> {
        let graph = Arc::clone(&self.graph);
        let Some(def) = graph.process_by_id(process_id) else {
            return Ok(());
        };
        if graph
            .start_activities(&filter, process_id)
            .is_empty()
        {
            return Ok(());
        }
        debug!(definition = %self.id, process = %process_id, "event start");
        let mut instance = ProcessInstance::new(
            def,
            self.environment.clone(),
            Arc::clone(&self.extensions),
            graph.as_ref(),
        );
        instance.run(graph.as_ref(), Some(filter), trigger, true)?;
        self.processes.push(instance);
        Ok(())
    }

    /// Deliver an api signal: addressed to one element, or anonymous
    pub fn signal(&mut self, message: ApiMessage) -> Result<(), EngineError> {
        self.deliver_api(message, None)
    }

    /// Deliver an anonymous or addressed message from the host
    pub fn send_message(&mut self, message: ApiMessage) -> Result<(), EngineError> {
        let trigger = CatchTrigger::Message { reference: None };
        self.deliver_api(message, Some(trigger))
    }

    fn deliver_api(
        &mut self,
        message: ApiMessage,
        trigger: Option<CatchTrigger>,
    ) -> Result<(), EngineError> {
        let graph = Arc::clone(&self.graph);
        if message.is_broadcast() {
            let trigger = trigger.unwrap_or(CatchTrigger::Signal { reference: None });
            for process in &mut self.processes {
                let _ = process.deliver(
                    &ApiMessage::default(),
                    &trigger,
                    message.message.clone(),
                    graph.as_ref(),
                )?;
            }
            return self.drain();
        }
        let trigger = trigger.unwrap_or(CatchTrigger::Api);
        let mut found = false;
        for process in &mut self.processes {
            if process.contains_target(&message) {
                found = process.deliver(&message, &trigger, message.message.clone(), graph.as_ref())?;
                break;
            }
        }
        if !found {
            // Maybe it addresses a start event of a process not yet running.
            found = self.start_by_element(&message)?;
        }
        if !found {
            return Err(EngineError::UnknownElement(
                message
                    .id
                    .or(message.execution_id)
                    .unwrap_or_default(),
            ));
        }
        self.drain()
    }

    /// Start the process owning an addressed start event
    fn start_by_element(&mut self, message: &ApiMessage) -> Result<bool, EngineError> {
        let Some(element_id) = message.id.as_deref() else {
            return Ok(false);
        };
        let graph = Arc::clone(&self.graph);
        let Some(def) = graph.activity_by_id(element_id) else {
            return Ok(false);
        };
        if !def.is_start {
            return Ok(false);
        }
        let process_id = def.parent_id.clone();
        if graph.process_by_id(&process_id).is_none() {
            return Ok(false);
        }
        self.start_lazy(&process_id, StartFilter::none(), message.message.clone())?;
        Ok(true)
    }

    /// Discard an addressed running activity
    pub fn cancel_activity(&mut self, message: ApiMessage) -> Result<(), EngineError> {
        let mut found = false;
        for process in &mut self.processes {
            if process.cancel(&message) {
                found = true;
                break;
            }
        }
        if !found {
            return Err(EngineError::UnknownElement(
                message.id.or(message.execution_id).unwrap_or_default(),
            ));
        }
        self.drain()
    }

    /// Fire due timers against their owning executions
    pub fn fire_timers(&mut self) -> Result<(), EngineError> {
        let graph = Arc::clone(&self.graph);
        let expired = self.environment.timers.expired(self.environment.now());
        for timer in expired {
            let target = ApiMessage::for_execution(&timer.owner);
            let trigger = CatchTrigger::Timer {
                timer_id: timer.id.clone(),
            };
            for process in &mut self.processes {
                if process.contains_target(&target) {
                    let _ = process.deliver(&target, &trigger, None, graph.as_ref())?;
                    break;
                }
            }
        }
        self.drain()
    }

    /// Freeze all instances; in-flight work stays unacknowledged
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        info!(definition = %self.id, "stop");
        self.stopped = true;
        let environment = self.environment.clone();
        for process in &mut self.processes {
            process.stop(&environment);
        }
    }

    /// Unfreeze and redeliver in-flight work
    pub fn resume(&mut self) -> Result<(), EngineError> {
        info!(definition = %self.id, "resume");
        self.stopped = false;
        let graph = Arc::clone(&self.graph);
        for process in &mut self.processes {
            process.resume(graph.as_ref())?;
        }
        self.drain()
    }

    /// Dry-run traversal of the sequences reachable from an element
    pub fn shake(&self, element_id: &str) -> Vec<ShakeRun> {
        shake::shake(self.graph.as_ref(), element_id)
    }

    pub fn get_postponed(&self) -> Vec<Content> {
        self.processes
            .iter()
            .flat_map(ProcessInstance::get_postponed)
            .collect()
    }

    pub fn processes(&self) -> &[ProcessInstance] {
        &self.processes
    }

    /// Pop the next observed event, oldest first
    pub fn next_event(&mut self) -> Option<(String, Content)> {
        self.broker.next("events-q").map(|delivery| {
            (
                delivery.message.fields.routing_key.clone(),
                delivery.message.content,
            )
        })
    }

    /// Drain all observed events
    pub fn drain_events(&mut self) -> Vec<(String, Content)> {
        let mut events = Vec::new();
        while let Some(event) = self.next_event() {
            events.push(event);
        }
        events
    }

    pub fn get_state(&self) -> DefinitionState {
        DefinitionState {
            id: self.id.clone(),
            execution_id: self.execution_id.clone(),
            status: self.status,
            stopped: self.stopped,
            completed: self.completed,
            environment: self.environment.state(),
            processes: self.processes.iter().map(ProcessInstance::state).collect(),
            calls: self
                .calls
                .iter()
                .map(|c| CallBindingState {
                    caller_execution_id: c.caller_execution_id.clone(),
                    called_index: c.called_index,
                })
                .collect(),
            failure: self.failure.clone(),
            broker: self.broker.state(),
        }
    }

    pub fn recover(
        graph: Arc<dyn ProcessGraph>,
        environment: Environment,
        state: &DefinitionState,
    ) -> Self {
        let environment = environment.recover(state.environment.clone());
        let mut definition = Self::new(state.id.clone(), Arc::clone(&graph), environment);
        definition.broker.recover(&state.broker);
        definition.execution_id = state.execution_id.clone();
        definition.status = state.status;
        definition.stopped = state.stopped;
        definition.completed = state.completed;
        for process_state in &state.processes {
            let Some(def) = graph.process_by_id(&process_state.id) else {
                warn!(definition = %definition.id, process = %process_state.id, "unknown process in state");
                continue;
            };
            let def = def.clone();
            let instance = ProcessInstance::recover(
                &def,
                process_state,
                definition.environment.clone(),
                Arc::clone(&definition.extensions),
                graph.as_ref(),
            );
            definition.processes.push(instance);
        }
        definition.calls = state
            .calls
            .iter()
            .map(|c| CallBinding {
                caller_execution_id: c.caller_execution_id.clone(),
                called_index: c.called_index,
            })
            .collect();
        definition.failure = state.failure.clone();
        definition
    }
}
