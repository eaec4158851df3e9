// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-owner message broker
//!
//! Every execution layer owns one broker. Publishing only enqueues; the
//! owner drains its queues with [`Broker::next`] and settles each delivery
//! with ack or nack. Nothing runs concurrently with the owner, which keeps
//! dispatch deterministic.

use crate::exchange::{Exchange, ExchangeType};
use crate::message::{Message, MessageProperties, Publish};
use crate::pattern::RoutingPattern;
use crate::queue::{Consumer, Queue, QueueOptions};
use crate::state::{BindingState, BrokerState, ExchangeState, QueueState};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::trace;
use weir_core::Content;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BrokerError {
    #[error("unknown exchange {0}")]
    UnknownExchange(String),
    #[error("unknown queue {0}")]
    UnknownQueue(String),
    /// A mandatory publish reached no queue with a consumer
    #[error("message {routing_key} on exchange {exchange} was not consumed")]
    Undeliverable {
        exchange: String,
        routing_key: String,
    },
    #[error("consume on queue {0} refused")]
    ConsumeRefused(String),
}

/// Consumer registration options
#[derive(Debug, Clone, Default)]
pub struct ConsumeOptions {
    pub consumer_tag: Option<String>,
    pub priority: i32,
    pub exclusive: bool,
    /// Deliveries are settled immediately, no ack required
    pub no_ack: bool,
}

impl ConsumeOptions {
    pub fn tagged(tag: impl Into<String>) -> Self {
        Self {
            consumer_tag: Some(tag.into()),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_no_ack(mut self) -> Self {
        self.no_ack = true;
        self
    }
}

/// A message handed to the owner by [`Broker::next`]
#[derive(Debug, Clone)]
pub struct Delivery {
    pub consumer_tag: String,
    /// Zero when delivered under no-ack
    pub delivery_tag: u64,
    pub message: Message,
}

#[derive(Debug, Clone, Default)]
pub struct Broker {
    exchanges: BTreeMap<String, Exchange>,
    queues: BTreeMap<String, Queue>,
    no_ack_tags: Vec<String>,
    next_delivery_tag: u64,
    next_message_id: u64,
    next_consumer_id: u64,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assert_exchange(&mut self, name: &str, kind: ExchangeType, durable: bool) {
        self.exchanges
            .entry(name.to_string())
            .or_insert_with(|| Exchange::new(name, kind, durable));
    }

    pub fn assert_queue(&mut self, name: &str, options: QueueOptions) {
        self.queues
            .entry(name.to_string())
            .or_insert_with(|| Queue::new(name, options));
    }

    pub fn bind_queue(
        &mut self,
        queue_name: &str,
        exchange_name: &str,
        pattern: &str,
        priority: i32,
    ) -> Result<(), BrokerError> {
        if !self.queues.contains_key(queue_name) {
            return Err(BrokerError::UnknownQueue(queue_name.to_string()));
        }
        let exchange = self
            .exchanges
            .get_mut(exchange_name)
            .ok_or_else(|| BrokerError::UnknownExchange(exchange_name.to_string()))?;
        exchange.bind(queue_name, RoutingPattern::from(pattern), priority);
        Ok(())
    }

    pub fn unbind_queue(
        &mut self,
        queue_name: &str,
        exchange_name: &str,
        pattern: &str,
    ) -> Result<(), BrokerError> {
        let exchange = self
            .exchanges
            .get_mut(exchange_name)
            .ok_or_else(|| BrokerError::UnknownExchange(exchange_name.to_string()))?;
        exchange.unbind(queue_name, &RoutingPattern::from(pattern));
        Ok(())
    }

    /// Route a message through an exchange into every matching queue.
    ///
    /// Mandatory publishes fail synchronously when no matching queue has a
    /// consumer, which is how unhandled errors surface to the caller.
    pub fn publish(
        &mut self,
        exchange_name: &str,
        routing_key: &str,
        content: Content,
        options: Publish,
    ) -> Result<(), BrokerError> {
        let exchange = self
            .exchanges
            .get(exchange_name)
            .ok_or_else(|| BrokerError::UnknownExchange(exchange_name.to_string()))?;
        let targets = exchange.route(routing_key);

        let consumed = targets
            .iter()
            .filter_map(|name| self.queues.get(name))
            .any(|q| q.consumer_count() > 0);
        if options.mandatory && !consumed {
            return Err(BrokerError::Undeliverable {
                exchange: exchange_name.to_string(),
                routing_key: routing_key.to_string(),
            });
        }

        self.next_message_id += 1;
        let message = Message {
            fields: crate::message::MessageFields {
                routing_key: routing_key.to_string(),
                exchange: exchange_name.to_string(),
                redelivered: false,
            },
            content,
            properties: MessageProperties {
                message_id: format!("smsg_{}", self.next_message_id),
                persistent: options.persistent,
                mandatory: options.mandatory,
                correlation_id: options.correlation_id,
            },
        };
        trace!(exchange = exchange_name, routing_key, queues = targets.len(), "publish");
        for name in targets {
            if let Some(queue) = self.queues.get_mut(&name) {
                queue.queue_message(message.clone());
            }
        }
        Ok(())
    }

    /// Enqueue directly, bypassing exchanges. Used on recovery.
    pub fn send_to_queue(&mut self, queue_name: &str, message: Message) -> Result<(), BrokerError> {
        let queue = self
            .queues
            .get_mut(queue_name)
            .ok_or_else(|| BrokerError::UnknownQueue(queue_name.to_string()))?;
        queue.queue_message(message);
        Ok(())
    }

    /// Register a consumer; deliveries are pulled with [`Broker::next`]
    pub fn consume(
        &mut self,
        queue_name: &str,
        options: ConsumeOptions,
    ) -> Result<String, BrokerError> {
        let queue = self
            .queues
            .get_mut(queue_name)
            .ok_or_else(|| BrokerError::UnknownQueue(queue_name.to_string()))?;
        let tag = options.consumer_tag.unwrap_or_else(|| {
            self.next_consumer_id += 1;
            format!("ct_{}", self.next_consumer_id)
        });
        queue
            .add_consumer(Consumer {
                tag: tag.clone(),
                priority: options.priority,
                exclusive: options.exclusive,
            })
            .map_err(BrokerError::ConsumeRefused)?;
        if options.no_ack {
            self.no_ack_tags.push(tag.clone());
        }
        Ok(tag)
    }

    /// Remove a consumer and delete any auto-delete queue it leaves empty
    pub fn cancel(&mut self, consumer_tag: &str) {
        self.no_ack_tags.retain(|t| t != consumer_tag);
        let mut dropped = Vec::new();
        for queue in self.queues.values_mut() {
            if queue.remove_consumer(consumer_tag)
                && queue.options.auto_delete
                && queue.consumer_count() == 0
            {
                dropped.push(queue.name.clone());
            }
        }
        for name in dropped {
            self.queues.remove(&name);
            for exchange in self.exchanges.values_mut() {
                exchange.unbind_queue(&name);
            }
        }
    }

    /// Deliver the head of a queue to its highest-priority consumer
    pub fn next(&mut self, queue_name: &str) -> Option<Delivery> {
        let queue = self.queues.get_mut(queue_name)?;
        let tag = self.next_delivery_tag + 1;
        let (consumer_tag, message) = queue.deliver(tag)?;
        self.next_delivery_tag = tag;
        if self.no_ack_tags.iter().any(|t| t == &consumer_tag) {
            queue.ack(tag);
            return Some(Delivery {
                consumer_tag,
                delivery_tag: 0,
                message,
            });
        }
        Some(Delivery {
            consumer_tag,
            delivery_tag: tag,
            message,
        })
    }

    pub fn ack(&mut self, queue_name: &str, delivery_tag: u64) {
        if let Some(queue) = self.queues.get_mut(queue_name) {
            queue.ack(delivery_tag);
        }
    }

    pub fn nack(&mut self, queue_name: &str, delivery_tag: u64, requeue: bool) {
        if let Some(queue) = self.queues.get_mut(queue_name) {
            queue.nack(delivery_tag, requeue);
        }
    }

    pub fn purge_queue(&mut self, queue_name: &str) -> usize {
        self.queues
            .get_mut(queue_name)
            .map(Queue::purge)
            .unwrap_or(0)
    }

    pub fn delete_queue(&mut self, queue_name: &str) {
        self.queues.remove(queue_name);
        for exchange in self.exchanges.values_mut() {
            exchange.unbind_queue(queue_name);
        }
    }

    pub fn queue(&self, queue_name: &str) -> Option<&Queue> {
        self.queues.get(queue_name)
    }

    pub fn exchange(&self, exchange_name: &str) -> Option<&Exchange> {
        self.exchanges.get(exchange_name)
    }

    pub fn queue_names(&self) -> impl Iterator<Item = &str> {
        self.queues.keys().map(String::as_str)
    }

    /// Anything left to drain across all queues?
    pub fn has_pending(&self) -> bool {
        self.queues.values().any(|q| !q.is_empty())
    }

    /// Drop every exchange, queue and consumer
    pub fn reset(&mut self) {
        self.exchanges.clear();
        self.queues.clear();
        self.no_ack_tags.clear();
    }

    /// Snapshot durable exchanges and durable queues.
    ///
    /// Unacked messages are captured as undelivered and flagged redelivered,
    /// so a recovered owner sees its in-flight work again.
    pub fn state(&self) -> BrokerState {
        let exchanges = self
            .exchanges
            .values()
            .filter(|e| e.durable)
            .map(|e| ExchangeState {
                name: e.name.clone(),
                kind: e.kind,
                bindings: e
                    .bindings()
                    .iter()
                    .filter(|b| {
                        self.queues
                            .get(&b.queue_name)
                            .is_some_and(|q| q.options.durable)
                    })
                    .map(|b| BindingState {
                        queue_name: b.queue_name.clone(),
                        pattern: b.pattern.as_str().to_string(),
                        priority: b.priority,
                    })
                    .collect(),
            })
            .collect();

        let queues = self
            .queues
            .values()
            .filter(|q| q.options.durable)
            .map(|q| {
                let mut snapshot = q.clone();
                snapshot.requeue_unacked();
                QueueState {
                    name: q.name.clone(),
                    options: q.options,
                    messages: snapshot
                        .messages
                        .into_iter()
                        .filter(|m| m.properties.persistent)
                        .collect(),
                }
            })
            .collect();

        BrokerState { exchanges, queues }
    }

    /// Rebuild exchanges, queues and pending messages from a snapshot.
    /// Consumers are not recovered; owners re-subscribe on resume.
    pub fn recover(&mut self, state: &BrokerState) {
        for exchange in &state.exchanges {
            self.assert_exchange(&exchange.name, exchange.kind, true);
            for binding in &exchange.bindings {
                self.assert_queue(&binding.queue_name, QueueOptions::default());
                let _ = self.bind_queue(
                    &binding.queue_name,
                    &exchange.name,
                    &binding.pattern,
                    binding.priority,
                );
            }
        }
        for queue in &state.queues {
            self.assert_queue(&queue.name, queue.options);
            for message in &queue.messages {
                let _ = self.send_to_queue(&queue.name, message.clone());
            }
        }
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
