// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queues with acknowledgment and redelivery
//!
//! A queue holds undelivered messages in FIFO order plus the set of
//! delivered-but-unacknowledged messages. Ack removes, nack requeues at the
//! head (marked redelivered) or drops. Consumers carry priority and an
//! exclusivity flag; delivery always goes to the highest-priority consumer.

use crate::message::Message;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Queue creation options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueOptions {
    /// Durable queues (and their persistent messages) appear in snapshots
    pub durable: bool,
    /// Deleted when the last consumer cancels
    pub auto_delete: bool,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            durable: true,
            auto_delete: false,
        }
    }
}

impl QueueOptions {
    pub fn transient() -> Self {
        Self {
            durable: false,
            auto_delete: true,
        }
    }
}

/// A registered consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumer {
    pub tag: String,
    pub priority: i32,
    pub exclusive: bool,
}

/// A delivered message awaiting acknowledgment
#[derive(Debug, Clone)]
pub(crate) struct Unacked {
    pub delivery_tag: u64,
    pub consumer_tag: String,
    pub message: Message,
}

/// A FIFO queue with consumer bookkeeping
#[derive(Debug, Clone, Default)]
pub struct Queue {
    pub name: String,
    pub options: QueueOptions,
    pub(crate) messages: VecDeque<Message>,
    pub(crate) unacked: Vec<Unacked>,
    pub(crate) consumers: Vec<Consumer>,
}

impl Queue {
    pub fn new(name: impl Into<String>, options: QueueOptions) -> Self {
        Self {
            name: name.into(),
            options,
            messages: VecDeque::new(),
            unacked: Vec::new(),
            consumers: Vec::new(),
        }
    }

    /// Undelivered message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn unacked_len(&self) -> usize {
        self.unacked.len()
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    pub(crate) fn queue_message(&mut self, message: Message) {
        self.messages.push_back(message);
    }

    /// Register a consumer, keeping the list ordered by priority (highest
    /// first, stable for equal priorities).
    pub(crate) fn add_consumer(&mut self, consumer: Consumer) -> Result<(), String> {
        if self.consumers.iter().any(|c| c.exclusive) || (consumer.exclusive && !self.consumers.is_empty()) {
            return Err(self.name.clone());
        }
        if self.consumers.iter().any(|c| c.tag == consumer.tag) {
            return Err(self.name.clone());
        }
        let at = self
            .consumers
            .iter()
            .position(|c| c.priority < consumer.priority)
            .unwrap_or(self.consumers.len());
        self.consumers.insert(at, consumer);
        Ok(())
    }

    pub(crate) fn remove_consumer(&mut self, tag: &str) -> bool {
        let before = self.consumers.len();
        self.consumers.retain(|c| c.tag != tag);
        before != self.consumers.len()
    }

    /// Deliver the head message to the highest-priority consumer
    pub(crate) fn deliver(&mut self, delivery_tag: u64) -> Option<(String, Message)> {
        let consumer_tag = self.consumers.first()?.tag.clone();
        let message = self.messages.pop_front()?;
        self.unacked.push(Unacked {
            delivery_tag,
            consumer_tag: consumer_tag.clone(),
            message: message.clone(),
        });
        Some((consumer_tag, message))
    }

    /// Acknowledge a delivery; returns the settled message
    pub(crate) fn ack(&mut self, delivery_tag: u64) -> Option<Message> {
        let at = self
            .unacked
            .iter()
            .position(|u| u.delivery_tag == delivery_tag)?;
        Some(self.unacked.remove(at).message)
    }

    /// Negative-acknowledge: requeue at the head (redelivered) or drop
    pub(crate) fn nack(&mut self, delivery_tag: u64, requeue: bool) -> bool {
        let Some(at) = self
            .unacked
            .iter()
            .position(|u| u.delivery_tag == delivery_tag)
        else {
            return false;
        };
        let mut unacked = self.unacked.remove(at);
        if requeue {
            unacked.message.fields.redelivered = true;
            self.messages.push_front(unacked.message);
        }
        true
    }

    /// Drop every undelivered message; unacked messages are kept
    pub(crate) fn purge(&mut self) -> usize {
        let count = self.messages.len();
        self.messages.clear();
        count
    }

    /// Return unacked messages to the head of the queue marked redelivered,
    /// preserving delivery order. Used on recovery.
    pub(crate) fn requeue_unacked(&mut self) {
        for unacked in self.unacked.drain(..).rev() {
            let mut message = unacked.message;
            message.fields.redelivered = true;
            self.messages.push_front(message);
        }
    }

    #[cfg(test)]
    pub(crate) fn peek(&self) -> Option<&Message> {
        self.messages.front()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
