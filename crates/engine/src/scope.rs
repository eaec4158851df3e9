// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scope execution: one process body or sub-process body
//!
//! A scope owns its child activities and sequence flows. Draining a scope
//! pulls each child's events, stamps the parent chain, applies outbound flow
//! actions to downstream elements, arms and disarms boundary events, routes
//! delegated throws to local catchers, and maintains the postponed set. The
//! scope completes when it has started, nothing is postponed, no error is
//! recorded and it was not stopped.

use crate::activity::{Activity, Extensions};
use crate::api::{ApiMessage, CatchTrigger};
use crate::error::EngineError;
use crate::flow::SequenceFlow;
use crate::state::ScopeState;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, trace, warn};
use weir_core::error::ErrorDetail;
use weir_core::{Content, Environment, Parent, ProcessGraph, StartFilter};

pub struct ScopeExecution {
    scope_id: String,
    scope_kind: String,
    execution_id: String,
    environment: Environment,
    extensions: Extensions,
    activities: Vec<Activity>,
    flows: Vec<SequenceFlow>,
    postponed: Vec<Content>,
    events: Vec<(String, Content)>,
    /// Raised errors still looking for a catcher
    uncaught: Vec<Content>,
    /// Delegated throws still looking for a local catcher
    pending_throws: Vec<(String, Content)>,
    started: bool,
    completed: bool,
    terminated: bool,
    stopped: bool,
    error: Option<ErrorDetail>,
}

impl ScopeExecution {
    pub fn new(
        scope_id: &str,
        scope_kind: &str,
        execution_id: &str,
        environment: Environment,
        graph: &dyn ProcessGraph,
    ) -> Self {
        let extensions: Extensions = Arc::new(Vec::new());
        let activities = graph
            .activities(scope_id)
            .into_iter()
            .map(|def| {
                Activity::new(
                    def.clone(),
                    environment.clone(),
                    Arc::clone(&extensions),
                    graph,
                )
            })
            .collect();
        let flows = graph
            .sequence_flows(scope_id)
            .into_iter()
            .map(|def| SequenceFlow::new(def.clone()))
            .collect();
        Self {
            scope_id: scope_id.to_string(),
            scope_kind: scope_kind.to_string(),
            execution_id: execution_id.to_string(),
            environment,
            extensions,
            activities,
            flows,
            postponed: Vec::new(),
            events: Vec::new(),
            uncaught: Vec::new(),
            pending_throws: Vec::new(),
            started: false,
            completed: false,
            terminated: false,
            stopped: false,
            error: None,
        }
    }

    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Arc::clone(&extensions);
        for activity in &mut self.activities {
            activity.set_extensions(Arc::clone(&extensions));
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.scope_id
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    fn as_parent(&self) -> Parent {
        Parent::new(&self.scope_id, &self.scope_kind, &self.execution_id)
    }

    /// Trigger the scope's start elements. Drains nothing; call [`Self::drain`].
    ///
    /// `triggered` marks start events whose catching trigger already arrived,
    /// so they complete instead of arming a wait.
    pub fn run(
        &mut self,
        graph: &dyn ProcessGraph,
        filter: Option<StartFilter>,
        trigger: Option<Value>,
        triggered: bool,
    ) -> Result<(), EngineError> {
        self.started = true;
        let filter = filter.unwrap_or_default();
        let mut start_ids: Vec<String> = graph
            .start_activities(&filter, &self.scope_id)
            .into_iter()
            .map(|def| def.id.clone())
            .collect();
        if start_ids.is_empty() {
            // No explicit start element: every flow-less, unattached element
            // is a starting point.
            start_ids = self
                .activities
                .iter()
                .filter(|a| a.def.attached_to.is_none())
                .filter(|a| graph.inbound_sequence_flows(a.id()).is_empty())
                .map(|a| a.id().to_string())
                .collect();
        }
        if start_ids.is_empty() {
            debug!(scope = %self.scope_id, "nothing to start, scope completes empty");
            self.completed = true;
            return Ok(());
        }
        for id in start_ids {
            if let Some(activity) = self.activity_mut(&id) {
                let mut content = Content::default();
                content.message = trigger.clone();
                if triggered {
                    content
                        .extra
                        .insert("triggered".to_string(), Value::Bool(true));
                }
                activity.run(content);
            }
        }
        Ok(())
    }

    fn activity_mut(&mut self, id: &str) -> Option<&mut Activity> {
        self.activities.iter_mut().find(|a| a.id() == id)
    }

    /// Process child work to quiescence
    pub fn drain(&mut self, graph: &dyn ProcessGraph) -> Result<(), EngineError> {
        if self.stopped {
            return Ok(());
        }
        loop {
            let mut progressed = false;
            for index in 0..self.activities.len() {
                let events = self.activities[index].drain(graph)?;
                if events.is_empty() {
                    continue;
                }
                progressed = true;
                for (key, content) in events {
                    self.on_child_event(&key, content, graph)?;
                }
            }
            // Raised errors get a catch attempt once the pass settled, so a
            // boundary armed in the same pass has reached its wait.
            if !self.uncaught.is_empty() {
                let raised = std::mem::take(&mut self.uncaught);
                for content in raised {
                    let Some(detail) = content.error.clone() else {
                        continue;
                    };
                    if self.catch_error(&content, &detail) {
                        progressed = true;
                    } else {
                        self.uncaught.push(content);
                    }
                }
            }
            if !self.pending_throws.is_empty() {
                let throws = std::mem::take(&mut self.pending_throws);
                for (key, content) in throws {
                    let Some(trigger) = delegated_trigger(&key, &content) else {
                        continue;
                    };
                    if self.catch_local(&trigger, &content) {
                        progressed = true;
                    } else {
                        self.pending_throws.push((key, content));
                    }
                }
            }
            if !progressed {
                break;
            }
        }
        // Nothing local caught these; delegating kinds escalate to the parent.
        for (key, content) in std::mem::take(&mut self.pending_throws) {
            if content.extra_bool("delegate") {
                self.events.push((key, content));
            }
        }
        if let Some(content) = self.uncaught.first() {
            warn!(scope = %self.scope_id, element = %content.id, "uncaught error");
            self.error = content.error.clone();
        }
        self.check_completion();
        Ok(())
    }

    fn on_child_event(
        &mut self,
        key: &str,
        mut content: Content,
        graph: &dyn ProcessGraph,
    ) -> Result<(), EngineError> {
        let direct = content.parent.is_none();
        let owner = self.as_parent();
        content.parent = Some(match content.parent.take() {
            None => owner,
            Some(previous) => Parent::shift(owner, Some(previous)),
        });
        trace!(scope = %self.scope_id, key = %key, element = %content.id, direct, "child event");

        if let Some(trigger) = delegated_trigger(key, &content) {
            if !self.catch_local(&trigger, &content) {
                // Uncaught throws wait out the pass like errors do, then get
                // re-offered before being forwarded upward.
                self.pending_throws.push((key.to_string(), content));
            }
            return Ok(());
        }

        if direct {
            match key {
                "activity.leave" => {
                    self.postponed
                        .retain(|p| p.execution_id != content.execution_id);
                    self.discard_boundaries_of(&content.id);
                    let outbound = content.outbound.clone().unwrap_or_default();
                    for action in outbound {
                        self.apply_flow(action);
                    }
                }
                "activity.start" => {
                    self.replace_postponed(&content);
                    self.arm_boundaries_of(&content);
                }
                "activity.end" => {
                    self.replace_postponed(&content);
                    self.run_compensation_handlers(&content, graph);
                }
                "activity.error" => {
                    self.replace_postponed(&content);
                    self.uncaught.push(content.clone());
                }
                "process.terminate" => {
                    self.terminated = true;
                    let terminator = content.execution_id.clone();
                    for activity in &mut self.activities {
                        if activity.is_active()
                            && activity.execution_id() != Some(terminator.as_str())
                        {
                            activity.publish_command("discard");
                        }
                    }
                }
                _ if key.starts_with("activity.") => {
                    self.replace_postponed(&content);
                }
                _ => {}
            }
        }
        self.events.push((key.to_string(), content));
        Ok(())
    }

    fn replace_postponed(&mut self, content: &Content) {
        match self
            .postponed
            .iter_mut()
            .find(|p| p.execution_id == content.execution_id)
        {
            Some(existing) => *existing = content.clone(),
            None => self.postponed.push(content.clone()),
        }
    }

    fn apply_flow(&mut self, action: weir_core::FlowAction) {
        let Some(flow) = self.flows.iter_mut().find(|f| f.id() == action.id) else {
            warn!(scope = %self.scope_id, flow = %action.id, "unknown sequence flow");
            return;
        };
        let outcome = flow.apply(&action);
        let mut event_content = outcome.content;
        event_content.parent = Some(self.as_parent());
        self.events
            .push((outcome.routing_key.to_string(), event_content));
        if let Some(deliver) = outcome.deliver {
            let Some(target_id) = deliver.target_id.clone() else {
                warn!(scope = %self.scope_id, flow = %deliver.id, "flow without a target");
                return;
            };
            match self.activity_mut(&target_id) {
                Some(target) => target.inbound_flow(deliver),
                None => {
                    warn!(scope = %self.scope_id, target = %target_id, "flow target missing")
                }
            }
        }
    }

    fn arm_boundaries_of(&mut self, host: &Content) {
        let host_id = host.id.clone();
        let host_execution = host.execution_id.clone();
        for activity in &mut self.activities {
            if activity.def.attached_to.as_deref() != Some(host_id.as_str())
                || activity.is_active()
            {
                continue;
            }
            let mut content = Content::default();
            content.extra.insert(
                "attachedTo".to_string(),
                Value::String(host_id.clone()),
            );
            content.extra.insert(
                "hostExecutionId".to_string(),
                Value::String(host_execution.clone()),
            );
            activity.run(content);
        }
    }

    /// A caught compensation runs the handlers its associations point at
    fn run_compensation_handlers(&mut self, catcher: &Content, graph: &dyn ProcessGraph) {
        let compensates = graph.activity_by_id(&catcher.id).is_some_and(|def| {
            def.event_definitions
                .iter()
                .any(|s| matches!(s, weir_core::EventDefinitionSpec::Compensate))
        });
        if !compensates {
            return;
        }
        let targets: Vec<String> = graph
            .outbound_associations(&catcher.id)
            .into_iter()
            .map(|a| a.target_ref.clone())
            .collect();
        for target_id in targets {
            if let Some(handler) = self.activity_mut(&target_id) {
                if handler.is_active() {
                    continue;
                }
                let mut content = Content::default();
                content.message = catcher.message.clone();
                handler.run(content);
            }
        }
    }

    fn discard_boundaries_of(&mut self, host_id: &str) {
        // A host leaving on its error path keeps its boundaries armed; one
        // of them may still catch the raised error.
        if self.uncaught.iter().any(|c| c.id == host_id) {
            return;
        }
        for activity in &mut self.activities {
            if activity.def.attached_to.as_deref() == Some(host_id) && activity.is_active() {
                activity.publish_command("discard");
            }
        }
    }

    /// Offer an error raised by `source` to its waiting boundary catchers
    fn catch_error(&mut self, source: &Content, detail: &ErrorDetail) -> bool {
        let trigger = CatchTrigger::Error {
            code: detail.code().map(str::to_string),
        };
        let payload = serde_json::to_value(detail).ok();
        let broadcast = ApiMessage::default();
        for activity in &mut self.activities {
            if activity.def.attached_to.as_deref() != Some(source.id.as_str()) {
                continue;
            }
            if activity.deliver_trigger(&broadcast, &trigger, payload.clone()) {
                return true;
            }
        }
        false
    }

    /// Offer a delegated throw to waiting catchers in this scope
    fn catch_local(&mut self, trigger: &CatchTrigger, content: &Content) -> bool {
        let broadcast = ApiMessage::default();
        let payload = content.message.clone();
        let mut caught = false;
        for activity in &mut self.activities {
            if activity.execution_id() == Some(content.execution_id.as_str()) {
                continue;
            }
            if activity.deliver_trigger(&broadcast, trigger, payload.clone()) {
                caught = true;
            }
        }
        caught
    }

    /// Deliver an api trigger; true when at least one element accepted it
    pub fn deliver(
        &mut self,
        target: &ApiMessage,
        trigger: &CatchTrigger,
        payload: Option<Value>,
        _graph: &dyn ProcessGraph,
    ) -> Result<bool, EngineError> {
        let mut any = false;
        for activity in &mut self.activities {
            if activity.deliver_trigger(target, trigger, payload.clone()) {
                any = true;
                if !target.is_broadcast() {
                    break;
                }
            }
        }
        Ok(any)
    }

    pub fn contains_target(&self, target: &ApiMessage) -> bool {
        self.activities.iter().any(|a| a.contains_target(target))
    }

    /// Discard an addressed running element; true when one was found
    pub fn cancel(&mut self, target: &ApiMessage) -> bool {
        for activity in &mut self.activities {
            let addressed = target.id.as_deref() == Some(activity.id())
                || (target.execution_id.is_some()
                    && target.execution_id.as_deref() == activity.execution_id());
            if addressed && activity.is_active() {
                activity.publish_command("discard");
                return true;
            }
        }
        false
    }

    pub fn stop(&mut self, _environment: &Environment) {
        if self.stopped {
            return;
        }
        debug!(scope = %self.scope_id, "stop");
        self.stopped = true;
        for activity in &mut self.activities {
            activity.stop();
        }
    }

    pub fn resume(&mut self, graph: &dyn ProcessGraph) -> Result<(), EngineError> {
        self.stopped = false;
        for activity in &mut self.activities {
            activity.resume(graph)?;
        }
        self.drain(graph)
    }

    pub fn take_events(&mut self) -> Vec<(String, Content)> {
        std::mem::take(&mut self.events)
    }

    pub fn get_postponed(&self) -> Vec<Content> {
        self.postponed.clone()
    }

    pub fn error(&self) -> Option<&ErrorDetail> {
        self.error.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    pub fn activities(&self) -> &[Activity] {
        &self.activities
    }

    pub fn flows(&self) -> &[SequenceFlow] {
        &self.flows
    }

    fn check_completion(&mut self) {
        if !self.completed
            && self.started
            && !self.stopped
            && self.error.is_none()
            && self.postponed.is_empty()
        {
            debug!(scope = %self.scope_id, "completed");
            self.completed = true;
        }
    }

    pub fn state(&self) -> ScopeState {
        ScopeState {
            id: self.scope_id.clone(),
            execution_id: self.execution_id.clone(),
            started: self.started,
            completed: self.completed,
            terminated: self.terminated,
            stopped: self.stopped,
            environment: self.environment.state(),
            activities: self.activities.iter().map(Activity::state).collect(),
            flows: self.flows.iter().map(SequenceFlow::state).collect(),
        }
    }

    pub fn recover(
        scope_id: &str,
        scope_kind: &str,
        state: &ScopeState,
        environment: Environment,
        graph: &dyn ProcessGraph,
    ) -> Self {
        let extensions: Extensions = Arc::new(Vec::new());
        let mut activities = Vec::with_capacity(state.activities.len());
        for activity_state in &state.activities {
            let Some(def) = graph.activity_by_id(&activity_state.id) else {
                warn!(scope = %scope_id, element = %activity_state.id, "unknown element in state");
                continue;
            };
            activities.push(Activity::recover(
                def.clone(),
                activity_state,
                environment.clone(),
                Arc::clone(&extensions),
                graph,
            ));
        }
        let mut flows: Vec<SequenceFlow> = graph
            .sequence_flows(scope_id)
            .into_iter()
            .map(|def| SequenceFlow::new(def.clone()))
            .collect();
        for flow_state in &state.flows {
            if let Some(flow) = flows.iter_mut().find(|f| f.id() == flow_state.id) {
                flow.recover(flow_state);
            }
        }
        // In-flight children are postponed again; their detail comes back
        // through redelivery on resume.
        let postponed = activities
            .iter()
            .filter(|a| a.is_active())
            .map(|a| {
                let mut content =
                    Content::for_element(a.id(), a.def.kind.name());
                content.execution_id = a.execution_id().unwrap_or_default().to_string();
                content
            })
            .collect();
        Self {
            scope_id: scope_id.to_string(),
            scope_kind: scope_kind.to_string(),
            execution_id: state.execution_id.clone(),
            environment,
            extensions,
            activities,
            flows,
            postponed,
            events: Vec::new(),
            uncaught: Vec::new(),
            pending_throws: Vec::new(),
            started: state.started,
            completed: state.completed,
            terminated: state.terminated,
            stopped: state.stopped,
            error: None,
        }
    }
}

/// Recognize a thrown event heading through this scope looking for a catcher
fn delegated_trigger(key: &str, content: &Content) -> Option<CatchTrigger> {
    let reference = content
        .extra
        .get("reference")
        .and_then(Value::as_str)
        .map(str::to_string);
    match key {
        "activity.signal" => Some(CatchTrigger::Signal { reference }),
        "activity.message" => Some(CatchTrigger::Message { reference }),
        "activity.escalate" => Some(CatchTrigger::Escalation { code: reference }),
        "activity.link" => reference.map(|name| CatchTrigger::Link { name }),
        "activity.cancel" => Some(CatchTrigger::Cancel),
        "activity.compensate" => Some(CatchTrigger::Compensate),
        _ => None,
    }
}

#[cfg(test)]
#[path = "scope_tests.rs"]
mod tests;
