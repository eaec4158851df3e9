// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! weir-broker: in-process message broker
//!
//! One broker per owning execution object. Topic exchanges route by
//! routing-key pattern into FIFO queues; consumers have priority and
//! exclusivity; delivery is acknowledged explicitly and unacknowledged
//! messages are redelivered after recovery. A mandatory publish with no
//! bound consumer returns an error synchronously, which the engine uses to
//! fail loud on unobserved errors.
//!
//! Dispatch is cooperative and pull-based: publishing only enqueues, and the
//! owning object drains its queues in deterministic FIFO order. There is no
//! preemption and therefore no locking.

mod broker;
mod exchange;
mod message;
mod pattern;
mod queue;
mod state;

pub use broker::{Broker, BrokerError, ConsumeOptions, Delivery};
pub use exchange::{Binding, Exchange, ExchangeType};
pub use message::{Message, MessageFields, MessageProperties, Publish};
pub use pattern::RoutingPattern;
pub use queue::{Consumer, Queue, QueueOptions};
pub use state::{BindingState, BrokerState, ExchangeState, QueueState};
