// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Exchanges and bindings
//!
//! An exchange routes a published message to queue names. Topic exchanges
//! match the routing key against each binding's [`RoutingPattern`]; direct
//! exchanges require exact equality.

use crate::pattern::RoutingPattern;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExchangeType {
    Topic,
    Direct,
}

/// A queue bound to an exchange under a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub queue_name: String,
    pub pattern: RoutingPattern,
    pub priority: i32,
}

#[derive(Debug, Clone)]
pub struct Exchange {
    pub name: String,
    pub kind: ExchangeType,
    /// Durable exchanges appear in snapshots
    pub durable: bool,
    pub(crate) bindings: Vec<Binding>,
}

impl Exchange {
    pub fn new(name: impl Into<String>, kind: ExchangeType, durable: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            durable,
            bindings: Vec::new(),
        }
    }

    /// Bind a queue, keeping bindings ordered by priority (highest first,
    /// stable for equal priorities). Rebinding replaces the pattern.
    pub(crate) fn bind(&mut self, queue_name: &str, pattern: RoutingPattern, priority: i32) {
        self.bindings
            .retain(|b| !(b.queue_name == queue_name && b.pattern == pattern));
        let binding = Binding {
            queue_name: queue_name.into(),
            pattern,
            priority,
        };
        let at = self
            .bindings
            .iter()
            .position(|b| b.priority < binding.priority)
            .unwrap_or(self.bindings.len());
        self.bindings.insert(at, binding);
    }

    pub(crate) fn unbind(&mut self, queue_name: &str, pattern: &RoutingPattern) {
        self.bindings
            .retain(|b| !(b.queue_name == queue_name && b.pattern == *pattern));
    }

    pub(crate) fn unbind_queue(&mut self, queue_name: &str) {
        self.bindings.retain(|b| b.queue_name != queue_name);
    }

    /// Queue names matching a routing key, in binding priority order,
    /// deduplicated.
    pub(crate) fn route(&self, routing_key: &str) -> Vec<String> {
        let mut matched: Vec<String> = Vec::new();
        for binding in &self.bindings {
            let hit = match self.kind {
                ExchangeType::Topic => binding.pattern.matches(routing_key),
                ExchangeType::Direct => binding.pattern.as_str() == routing_key,
            };
            if hit && !matched.iter().any(|name| name == &binding.queue_name) {
                matched.push(binding.queue_name.clone());
            }
        }
        matched
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}

#[cfg(test)]
#[path = "exchange_tests.rs"]
mod tests;
