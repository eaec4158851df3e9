// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity run state machine
//!
//! Each element owns a broker whose `run-q` drives the lifecycle
//! `enter → start → execute → end|discarded → leave`. Behavior completion
//! arrives asynchronously on `execution-q`; external commands arrive on
//! `api-q` keyed `activity.<verb>.<executionId>`. A waiting behavior leaves
//! its `run.execute` message unacknowledged, which is the suspension point a
//! snapshot captures and a redelivery resumes.
//!
//! Parallel joins do not run on the first inbound trigger: they accumulate
//! one trigger per distinct source and converge exactly once.

use crate::api::{ApiMessage, CatchTrigger};
use crate::behaviour::{ActivityExecution, Outcome, Terminal};
use crate::error::EngineError;
use crate::outbound::{discard_outbound, evaluate_outbound};
use crate::state::ActivityState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};
use weir_broker::{Broker, ConsumeOptions, Delivery, ExchangeType, Publish, QueueOptions};
use weir_core::error::ErrorDetail;
use weir_core::{
    Content, ElementDefinition, ElementType, Environment, FlowAction, ProcessGraph,
    SequenceFlowDefinition,
};

/// Extension hook activated when an element is entered.
///
/// `activate` may return extra content fields; they travel through the
/// format queue and are merged into the run content before `start`.
pub trait Extension: Send + Sync {
    fn activate(
        &self,
        element: &ElementDefinition,
        content: &Content,
    ) -> Option<BTreeMap<String, Value>>;

    fn deactivate(&self, _element: &ElementDefinition) {}
}

pub type Extensions = Arc<Vec<Arc<dyn Extension>>>;

/// Derived per-element status; decisions are made from message content and
/// the postponed set, never from this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    #[default]
    Undefined,
    Init,
    Entered,
    Start,
    Executing,
    End,
    Discarded,
    #[serde(rename = "error")]
    Errored,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ActivityCounters {
    pub taken: usize,
    pub discarded: usize,
}

pub struct Activity {
    pub def: ElementDefinition,
    environment: Environment,
    extensions: Extensions,
    broker: Broker,
    execution_id: Option<String>,
    status: Status,
    pub counters: ActivityCounters,
    execution: Option<ActivityExecution>,
    /// Delivery tag of the in-flight `run.execute` while suspended
    pending_execute: Option<u64>,
    /// Accumulated inbound triggers, parallel joins only
    pending_join: Vec<FlowAction>,
    inbound: Vec<SequenceFlowDefinition>,
    outbound: Vec<SequenceFlowDefinition>,
    current: Content,
    stopped: bool,
}

impl Activity {
    pub fn new(
        def: ElementDefinition,
        environment: Environment,
        extensions: Extensions,
        graph: &dyn ProcessGraph,
    ) -> Self {
        let inbound = graph
            .inbound_sequence_flows(&def.id)
            .into_iter()
            .cloned()
            .collect();
        let outbound = graph
            .outbound_sequence_flows(&def.id)
            .into_iter()
            .cloned()
            .collect();
        let mut activity = Self {
            def,
            environment,
            extensions,
            broker: Broker::new(),
            execution_id: None,
            status: Status::Undefined,
            counters: ActivityCounters::default(),
            execution: None,
            pending_execute: None,
            pending_join: Vec::new(),
            inbound,
            outbound,
            current: Content::default(),
            stopped: false,
        };
        activity.assert_topology();
        activity
    }

    fn assert_topology(&mut self) {
        self.broker.assert_exchange("run", ExchangeType::Topic, true);
        self.broker
            .assert_exchange("execution", ExchangeType::Topic, true);
        self.broker
            .assert_exchange("event", ExchangeType::Topic, true);
        self.broker.assert_exchange("api", ExchangeType::Topic, false);

        self.broker.assert_queue("run-q", QueueOptions::default());
        self.broker
            .assert_queue("format-run-q", QueueOptions::default());
        self.broker
            .assert_queue("execution-q", QueueOptions::default());
        let transient = QueueOptions {
            durable: false,
            auto_delete: false,
        };
        self.broker.assert_queue("api-q", transient);
        self.broker.assert_queue("listen-q", transient);

        // assert_* is idempotent, bind/consume cannot fail on asserted names
        let _ = self.broker.bind_queue("run-q", "run", "run.#", 0);
        let _ = self.broker.bind_queue("format-run-q", "run", "format.#", 0);
        let _ = self
            .broker
            .bind_queue("execution-q", "execution", "execution.#", 0);
        let _ = self.broker.bind_queue("api-q", "api", "activity.#", 0);
        let _ = self.broker.bind_queue("listen-q", "event", "#", 0);

        let _ = self.broker.consume("run-q", ConsumeOptions::tagged("_run"));
        let _ = self
            .broker
            .consume("format-run-q", ConsumeOptions::tagged("_format").with_no_ack());
        let _ = self
            .broker
            .consume("execution-q", ConsumeOptions::tagged("_execution"));
        let _ = self
            .broker
            .consume("api-q", ConsumeOptions::tagged("_api").with_no_ack());
        let _ = self
            .broker
            .consume("listen-q", ConsumeOptions::tagged("_listener").with_no_ack());
    }

    pub fn id(&self) -> &str {
        &self.def.id
    }

    pub fn execution_id(&self) -> Option<&str> {
        self.execution_id.as_deref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub(crate) fn set_extensions(&mut self, extensions: Extensions) {
        self.extensions = extensions;
    }

    /// Between run (or queued run) and `leave`
    pub fn is_active(&self) -> bool {
        !matches!(self.status, Status::Undefined)
    }

    pub fn is_waiting(&self) -> bool {
        self.pending_execute.is_some()
            && self.execution.as_ref().is_some_and(ActivityExecution::is_waiting)
    }

    fn is_join(&self) -> bool {
        self.def.is_parallel_gateway() && distinct_sources(&self.inbound) > 1
    }

    /// Start a fresh run from an inbound take (or a process start)
    pub fn run(&mut self, mut content: Content) {
        let execution_id = self.environment.next_execution_id(&self.def.id);
        content.id = self.def.id.clone();
        content.kind = self.def.kind.name().to_string();
        content.execution_id = execution_id.clone();
        debug!(element = %self.def.id, execution = %execution_id, "run");
        self.execution_id = Some(execution_id);
        self.status = Status::Init;
        self.current = content.clone();
        self.publish_run("run.enter", content);
    }

    /// Run the discard path: no behavior, outbound flows all discarded
    pub fn discard_run(&mut self, mut content: Content) {
        let execution_id = self.environment.next_execution_id(&self.def.id);
        content.id = self.def.id.clone();
        content.kind = self.def.kind.name().to_string();
        content.execution_id = execution_id.clone();
        debug!(element = %self.def.id, execution = %execution_id, "discard run");
        self.execution_id = Some(execution_id);
        self.status = Status::Init;
        self.current = content.clone();
        self.publish_run("run.discard", content);
    }

    /// Deliver one inbound sequence-flow trigger.
    ///
    /// Plain elements run immediately and ignore further triggers while
    /// active. A parallel join accumulates one trigger per distinct source;
    /// `remaining = distinct sources - already touched - 1` reaching zero is
    /// the convergence point.
    pub fn inbound_flow(&mut self, action: FlowAction) {
        if self.is_join() {
            // Touches are keyed by the inbound flow's source element, the
            // same granularity `distinct_sources` counts convergence in.
            let source = flow_source(&self.inbound, &action.id);
            let source_touched = source.is_some()
                && self
                    .pending_join
                    .iter()
                    .any(|a| flow_source(&self.inbound, &a.id) == source);
            if source_touched {
                trace!(element = %self.def.id, "repeated touch ignored");
                return;
            }
            let remaining = distinct_sources(&self.inbound) - self.pending_join.len() - 1;
            self.pending_join.push(action);
            if remaining > 0 {
                trace!(element = %self.def.id, remaining, "join waiting");
                return;
            }
            let touched = std::mem::take(&mut self.pending_join);
            let taken = touched.iter().any(FlowAction::is_take);
            let mut content = Content::for_element(&self.def.id, self.def.kind.name());
            content.inbound = touched.clone();
            if taken {
                // The join itself takes; downstream sees a plain take.
                self.run(content);
            } else {
                content.discard_sequence = union_discard_sequences(&touched);
                self.discard_run(content);
            }
            return;
        }

        if self.is_active() {
            trace!(element = %self.def.id, "inbound while running ignored");
            return;
        }
        let mut content = Content::for_element(&self.def.id, self.def.kind.name());
        content.message = action.message.clone();
        content.discard_sequence = action.discard_sequence.clone();
        content.inbound = vec![action.clone()];
        match action.action {
            weir_core::FlowActionKind::Take => self.run(content),
            weir_core::FlowActionKind::Discard => self.discard_run(content),
        }
    }

    /// True if an addressed message targets this element or anything nested
    /// inside its current execution
    pub fn contains_target(&self, target: &ApiMessage) -> bool {
        target.id.as_deref() == Some(self.def.id.as_str())
            || (target.execution_id.is_some()
                && target.execution_id.as_deref() == self.execution_id.as_deref())
            || self
                .execution
                .as_ref()
                .is_some_and(|e| e.contains_target(target))
    }

    /// Offer an addressed or broadcast trigger; true if it was accepted
    pub fn deliver_trigger(
        &mut self,
        target: &ApiMessage,
        trigger: &CatchTrigger,
        payload: Option<Value>,
    ) -> bool {
        let broadcast_match = target.is_broadcast()
            && self
                .execution
                .as_ref()
                .and_then(ActivityExecution::wait)
                .is_some_and(|w| w.matches(trigger));
        if !(broadcast_match || (!target.is_broadcast() && self.contains_target(target))) {
            return false;
        }

        let mut content = self.current.clone();
        content.message = payload;
        if let Some(id) = &target.id {
            content
                .extra
                .insert("targetId".to_string(), Value::String(id.clone()));
        }
        if let Some(execution_id) = &target.execution_id {
            content.extra.insert(
                "targetExecutionId".to_string(),
                Value::String(execution_id.clone()),
            );
        }
        encode_trigger(trigger, &mut content);
        self.publish_api(trigger.verb(), content);
        true
    }

    /// Address a lifecycle command (stop, discard, cancel) to this execution
    pub fn publish_command(&mut self, verb: &str) {
        self.publish_api(verb, self.current.clone());
    }

    fn publish_api(&mut self, verb: &str, content: Content) {
        let address = self
            .execution_id
            .clone()
            .unwrap_or_else(|| self.def.id.clone());
        let key = format!("activity.{verb}.{address}");
        let _ = self.broker.publish("api", &key, content, Publish::default());
    }

    fn publish_run(&mut self, key: &str, content: Content) {
        let _ = self.broker.publish("run", key, content, Publish::persistent());
    }

    fn publish_execution(&mut self, key: &str, content: Content) {
        let _ = self
            .broker
            .publish("execution", key, content, Publish::persistent());
    }

    fn emit(&mut self, key: &str, content: Content) {
        let _ = self.broker.publish("event", key, content, Publish::default());
    }

    /// Process everything pending; returns the events for the owning scope
    pub fn drain(&mut self, graph: &dyn ProcessGraph) -> Result<Vec<(String, Content)>, EngineError> {
        if self.stopped {
            return Ok(self.collect_events());
        }
        loop {
            if let Some(delivery) = self.broker.next("api-q") {
                self.on_api(delivery, graph)?;
                continue;
            }
            if let Some(delivery) = self.broker.next("execution-q") {
                self.on_execution(delivery)?;
                continue;
            }
            let Some(delivery) = self.broker.next("run-q") else {
                break;
            };
            if !self.on_run(delivery, graph)? {
                // Suspended on an unacked run.execute.
                break;
            }
        }
        Ok(self.collect_events())
    }

    fn collect_events(&mut self) -> Vec<(String, Content)> {
        let mut events = Vec::new();
        while let Some(delivery) = self.broker.next("listen-q") {
            events.push((
                delivery.message.fields.routing_key.clone(),
                delivery.message.content,
            ));
        }
        events
    }

    /// Returns false when the run suspended on this delivery
    fn on_run(&mut self, delivery: Delivery, graph: &dyn ProcessGraph) -> Result<bool, EngineError> {
        let tag = delivery.delivery_tag;
        let redelivered = delivery.message.redelivered();
        let mut content = delivery.message.content;
        let key = delivery.message.fields.routing_key.clone();
        trace!(element = %self.def.id, key = %key, redelivered, "run");
        match key.as_str() {
            "run.enter" => {
                if !redelivered {
                    // A fresh run drops any stale execution snapshot.
                    self.execution = None;
                    self.activate_extensions(&content);
                }
                self.status = Status::Entered;
                self.current = content.clone();
                self.emit("activity.enter", content.clone());
                self.publish_run("run.start", content);
                self.broker.ack("run-q", tag);
            }
            "run.start" => {
                self.status = Status::Start;
                self.merge_format(&mut content);
                self.current = content.clone();
                self.emit("activity.start", content.clone());
                self.publish_run("run.execute", content);
                self.broker.ack("run-q", tag);
            }
            "run.execute" => {
                self.status = Status::Executing;
                self.current = content.clone();
                let resume = redelivered && self.execution.is_some();
                if self.execution.is_none() {
                    self.execution = Some(ActivityExecution::new(&self.def));
                }
                let Some(mut execution) = self.execution.take() else {
                    return Ok(true);
                };
                let outcome = if resume {
                    execution.resume(&self.def, &content, &self.environment, graph)
                } else {
                    execution.execute(&self.def, &content, &self.environment, graph)
                };
                self.execution = Some(execution);
                let outcome = outcome?;
                let suspended = outcome.terminal.is_none();
                self.apply_outcome(outcome, &content);
                if suspended {
                    self.emit("activity.wait", content);
                    self.pending_execute = Some(tag);
                    return Ok(false);
                }
                self.broker.ack("run-q", tag);
            }
            "run.end" => {
                self.status = Status::End;
                self.counters.taken += 1;
                let actions = match content.outbound.clone() {
                    // Upstream already decided, e.g. a join or a loop.
                    Some(actions) => actions,
                    None => {
                        let discard_rest =
                            matches!(self.def.kind, ElementType::ExclusiveGateway);
                        match evaluate_outbound(
                            &self.outbound,
                            &content,
                            &self.environment,
                            discard_rest,
                        ) {
                            Ok(actions) => actions,
                            Err(EngineError::Run(run)) => {
                                self.broker.ack("run-q", tag);
                                let mut errored = content;
                                errored.error = Some(ErrorDetail::RunError(run));
                                self.publish_run("run.error", errored);
                                return Ok(true);
                            }
                            Err(other) => return Err(other),
                        }
                    }
                };
                content.outbound = Some(actions);
                self.current = content.clone();
                self.emit("activity.end", content.clone());
                self.publish_run("run.leave", content);
                self.broker.ack("run-q", tag);
            }
            "run.discard" => {
                self.status = Status::Discarded;
                self.counters.discarded += 1;
                let actions = discard_outbound(&self.outbound, &content);
                content.outbound = Some(actions);
                self.current = content.clone();
                self.emit("activity.discarded", content.clone());
                self.publish_run("run.leave", content);
                self.broker.ack("run-q", tag);
            }
            "run.error" => {
                self.status = Status::Errored;
                self.current = content.clone();
                self.emit("activity.error", content.clone());
                self.publish_run("run.discard", content);
                self.broker.ack("run-q", tag);
            }
            "run.leave" => {
                self.emit("activity.leave", content);
                self.deactivate_extensions();
                self.execution = None;
                if let Some(execution_id) = &self.execution_id {
                    self.environment.timers.clear_owner(execution_id);
                }
                self.status = Status::Undefined;
                self.broker.ack("run-q", tag);
            }
            _ => {
                self.broker.ack("run-q", tag);
            }
        }
        Ok(true)
    }

    fn on_execution(&mut self, delivery: Delivery) -> Result<(), EngineError> {
        let key = delivery.message.fields.routing_key.clone();
        let execution_content = delivery.message.content;
        self.broker.ack("execution-q", delivery.delivery_tag);
        if let Some(tag) = self.pending_execute.take() {
            self.broker.ack("run-q", tag);
        }
        let mut content = self.current.clone();
        trace!(element = %self.def.id, key = %key, "execution settled");
        match key.as_str() {
            "execution.error" => {
                content.error = execution_content.error;
                self.publish_run("run.error", content);
            }
            "execution.cancel" | "execution.discard" => {
                content.discard_sequence = execution_content.discard_sequence;
                self.publish_run("run.discard", content);
            }
            // execution.completed, or anything else: implicit success
            _ => {
                if execution_content.message.is_some() {
                    content.message = execution_content.message;
                }
                self.publish_run("run.end", content);
            }
        }
        Ok(())
    }

    fn on_api(&mut self, delivery: Delivery, graph: &dyn ProcessGraph) -> Result<(), EngineError> {
        let key = delivery.message.fields.routing_key.clone();
        let content = delivery.message.content;
        let verb = key.split('.').nth(1).unwrap_or_default().to_string();
        trace!(element = %self.def.id, verb = %verb, "api");
        match verb.as_str() {
            "stop" => self.stop(),
            "discard" | "cancel" => {
                if !self.is_active() {
                    return Ok(());
                }
                if let Some(tag) = self.pending_execute.take() {
                    self.broker.ack("run-q", tag);
                }
                if self.execution.is_none() && self.status == Status::Init {
                    // Queued but never entered; drop the queued run.
                    self.broker.purge_queue("run-q");
                }
                if let Some(execution) = &mut self.execution {
                    execution.stop(&self.environment);
                }
                let mut discarded = self.current.clone();
                discarded.discard_sequence = content.discard_sequence;
                self.publish_run("run.discard", discarded);
            }
            _ => {
                let Some(trigger) = decode_trigger(&verb, &content) else {
                    return Ok(());
                };
                let target = ApiMessage {
                    id: content
                        .extra
                        .get("targetId")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    execution_id: content
                        .extra
                        .get("targetExecutionId")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    message: content.message.clone(),
                };
                let payload = content.message.clone();
                let Some(mut execution) = self.execution.take() else {
                    return Ok(());
                };
                let signalled = execution.signal(
                    &self.def,
                    &target,
                    &trigger,
                    payload,
                    &self.current,
                    &self.environment,
                    graph,
                );
                self.execution = Some(execution);
                if let Some(outcome) = signalled? {
                    let current = self.current.clone();
                    self.apply_outcome(outcome, &current);
                }
            }
        }
        Ok(())
    }

    fn apply_outcome(&mut self, outcome: Outcome, content: &Content) {
        for (key, event) in outcome.events {
            self.emit(&key, event);
        }
        match outcome.terminal {
            None => {}
            Some(Terminal::Completed(output)) => {
                let mut completed = content.clone();
                completed.message = output;
                self.publish_execution("execution.completed", completed);
            }
            Some(Terminal::Errored(detail)) => {
                let mut errored = content.clone();
                errored.error = Some(detail);
                self.publish_execution("execution.error", errored);
            }
            Some(Terminal::Discarded) => {
                self.publish_execution("execution.discard", content.clone());
            }
            Some(Terminal::Terminated) => {
                self.emit("process.terminate", content.clone());
                self.publish_execution("execution.completed", content.clone());
            }
        }
    }

    fn activate_extensions(&mut self, content: &Content) {
        let extensions = Arc::clone(&self.extensions);
        for extension in extensions.iter() {
            if let Some(extra) = extension.activate(&self.def, content) {
                let mut enrich = Content::for_element(&self.def.id, self.def.kind.name());
                enrich.extra = extra;
                let _ = self
                    .broker
                    .publish("run", "format.enrich", enrich, Publish::default());
            }
        }
    }

    fn deactivate_extensions(&mut self) {
        for extension in self.extensions.iter() {
            extension.deactivate(&self.def);
        }
    }

    fn merge_format(&mut self, content: &mut Content) {
        while let Some(delivery) = self.broker.next("format-run-q") {
            content.extra.extend(delivery.message.content.extra);
        }
    }

    /// Freeze: pending work stays unacknowledged, timers are cleared
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Some(execution) = &mut self.execution {
            execution.stop(&self.environment);
        }
        if let Some(execution_id) = &self.execution_id {
            self.environment.timers.clear_owner(execution_id);
        }
    }

    /// Unfreeze and redeliver in-flight work through the same handlers
    pub fn resume(&mut self, graph: &dyn ProcessGraph) -> Result<(), EngineError> {
        self.stopped = false;
        if let Some(tag) = self.pending_execute.take() {
            self.broker.nack("run-q", tag, true);
        }
        let _ = self.drain(graph)?;
        Ok(())
    }

    pub fn state(&self) -> ActivityState {
        ActivityState {
            id: self.def.id.clone(),
            kind: self.def.kind.name().to_string(),
            execution_id: self.execution_id.clone(),
            status: self.status,
            counters: self.counters,
            stopped: self.stopped,
            broker: self.broker.state(),
            execution: self.execution.as_ref().map(ActivityExecution::state),
            pending_join: self.pending_join.clone(),
        }
    }

    pub fn recover(
        def: ElementDefinition,
        state: &ActivityState,
        environment: Environment,
        extensions: Extensions,
        graph: &dyn ProcessGraph,
    ) -> Self {
        let mut activity = Self::new(def, environment, extensions, graph);
        activity.broker.recover(&state.broker);
        activity.execution_id = state.execution_id.clone();
        activity.status = state.status;
        activity.counters = state.counters;
        activity.pending_join = state.pending_join.clone();
        activity.execution = state.execution.as_ref().map(|execution_state| {
            ActivityExecution::recover(
                &activity.def,
                execution_state,
                &activity.environment,
                graph,
            )
        });
        activity
    }
}

/// Source element of the inbound flow with the given id
fn flow_source<'a>(flows: &'a [SequenceFlowDefinition], flow_id: &str) -> Option<&'a str> {
    flows
        .iter()
        .find(|f| f.id == flow_id)
        .map(|f| f.source_ref.as_str())
}

fn distinct_sources(flows: &[SequenceFlowDefinition]) -> usize {
    let mut sources: Vec<&str> = flows.iter().map(|f| f.source_ref.as_str()).collect();
    sources.sort_unstable();
    sources.dedup();
    sources.len()
}

/// Union of accumulated discard sequences, first touch first, deduplicated
fn union_discard_sequences(touched: &[FlowAction]) -> Vec<String> {
    let mut union = Vec::new();
    for action in touched {
        for id in &action.discard_sequence {
            if !union.iter().any(|u| u == id) {
                union.push(id.clone());
            }
        }
    }
    union
}

fn encode_trigger(trigger: &CatchTrigger, content: &mut Content) {
    match trigger {
        CatchTrigger::Signal { reference: Some(r) }
        | CatchTrigger::Message { reference: Some(r) } => {
            content
                .extra
                .insert("reference".to_string(), Value::String(r.clone()));
        }
        CatchTrigger::Error { code: Some(c) } | CatchTrigger::Escalation { code: Some(c) } => {
            content
                .extra
                .insert("code".to_string(), Value::String(c.clone()));
        }
        CatchTrigger::Timer { timer_id } => {
            content
                .extra
                .insert("timerId".to_string(), Value::String(timer_id.clone()));
        }
        CatchTrigger::Link { name } => {
            content
                .extra
                .insert("linkName".to_string(), Value::String(name.clone()));
        }
        CatchTrigger::Api if content.extra.contains_key("targetId")
            || content.extra.contains_key("targetExecutionId") => {}
        _ => {}
    }
    content.extra.insert(
        "trigger".to_string(),
        Value::String(trigger_kind(trigger).to_string()),
    );
}

fn trigger_kind(trigger: &CatchTrigger) -> &'static str {
    match trigger {
        CatchTrigger::Api => "api",
        CatchTrigger::Signal { .. } => "signal",
        CatchTrigger::Message { .. } => "message",
        CatchTrigger::Timer { .. } => "timer",
        CatchTrigger::Error { .. } => "error",
        CatchTrigger::Escalation { .. } => "escalation",
        CatchTrigger::Link { .. } => "link",
        CatchTrigger::Cancel => "cancel",
        CatchTrigger::Compensate => "compensate",
    }
}

fn decode_trigger(verb: &str, content: &Content) -> Option<CatchTrigger> {
    let reference = content
        .extra
        .get("reference")
        .and_then(Value::as_str)
        .map(str::to_string);
    let code = content
        .extra
        .get("code")
        .and_then(Value::as_str)
        .map(str::to_string);
    let kind = content.extra.get("trigger").and_then(Value::as_str);
    match verb {
        "signal" if kind == Some("api") || kind.is_none() => Some(CatchTrigger::Api),
        "signal" => Some(CatchTrigger::Signal { reference }),
        "message" => Some(CatchTrigger::Message { reference }),
        "timer" => content
            .extra
            .get("timerId")
            .and_then(Value::as_str)
            .map(|id| CatchTrigger::Timer {
                timer_id: id.to_string(),
            }),
        "error" => Some(CatchTrigger::Error { code }),
        "escalate" => Some(CatchTrigger::Escalation { code }),
        "link" => content
            .extra
            .get("linkName")
            .and_then(Value::as_str)
            .map(|name| CatchTrigger::Link {
                name: name.to_string(),
            }),
        "cancel" => Some(CatchTrigger::Cancel),
        "compensate" => Some(CatchTrigger::Compensate),
        _ => None,
    }
}

#[cfg(test)]
#[path = "activity_tests.rs"]
mod tests;
