// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Serializable broker snapshot
//!
//! Only durable exchanges, durable queues and persistent messages are
//! captured. Recovering from a snapshot taken mid-run yields the same
//! pending work the stopped broker held.

use crate::exchange::ExchangeType;
use crate::message::Message;
use crate::queue::QueueOptions;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerState {
    pub exchanges: Vec<ExchangeState>,
    pub queues: Vec<QueueState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeState {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ExchangeType,
    #[serde(default)]
    pub bindings: Vec<BindingState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingState {
    pub queue_name: String,
    pub pattern: String,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    pub name: String,
    #[serde(default)]
    pub options: QueueOptions,
    #[serde(default)]
    pub messages: Vec<Message>,
}
