// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker message envelope

use serde::{Deserialize, Serialize};
use weir_core::Content;

/// Routing metadata stamped by the broker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageFields {
    pub routing_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub exchange: String,
    /// Set when a message is delivered again after a nack or recovery; the
    /// handler reapplies state transitions but skips irreversible effects
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub redelivered: bool,
}

/// Sender-supplied properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageProperties {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message_id: String,
    /// Persistent messages survive in snapshots of durable queues
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub persistent: bool,
    /// Mandatory publishes error out when no bound consumer receives them
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub mandatory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

/// Publish options
#[derive(Debug, Clone, Default)]
pub struct Publish {
    pub persistent: bool,
    pub mandatory: bool,
    pub correlation_id: Option<String>,
}

impl Publish {
    pub fn persistent() -> Self {
        Self {
            persistent: true,
            ..Self::default()
        }
    }

    pub fn mandatory() -> Self {
        Self {
            persistent: true,
            mandatory: true,
            ..Self::default()
        }
    }
}

/// A routed message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Message {
    pub fields: MessageFields,
    pub content: Content,
    pub properties: MessageProperties,
}

impl Message {
    pub fn new(routing_key: impl Into<String>, content: Content) -> Self {
        Self {
            fields: MessageFields {
                routing_key: routing_key.into(),
                exchange: String::new(),
                redelivered: false,
            },
            content,
            properties: MessageProperties::default(),
        }
    }

    pub fn routing_key(&self) -> &str {
        &self.fields.routing_key
    }

    pub fn redelivered(&self) -> bool {
        self.fields.redelivered
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
