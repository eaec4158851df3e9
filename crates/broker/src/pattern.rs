// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routing-key pattern matching
//!
//! Patterns bind queues to exchanges. Keys are `.`-separated words; `*`
//! matches exactly one word, `#` matches the remainder (zero or more words).

use serde::{Deserialize, Serialize};

/// Pattern for matching routing keys
/// Supports:
///   - Exact: "run.enter"
///   - Single wildcard: "run.*" matches "run.enter", "run.leave"
///   - Rest: "activity.#" matches all activity keys, "#" matches everything
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingPattern(String);

impl RoutingPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// Check if this pattern matches a routing key
    pub fn matches(&self, routing_key: &str) -> bool {
        if self.0.is_empty() {
            return false;
        }
        if self.0 == "#" {
            return true;
        }

        let pattern_parts: Vec<&str> = self.0.split('.').collect();
        let key_parts: Vec<&str> = routing_key.split('.').collect();

        Self::match_words(&pattern_parts, &key_parts)
    }

    fn match_words(pattern: &[&str], key: &[&str]) -> bool {
        match (pattern.first(), key.first()) {
            (None, None) => true,
            (Some(&"#"), _) => true, // # matches everything remaining
            (Some(&"*"), Some(_)) => Self::match_words(&pattern[1..], &key[1..]),
            (Some(p), Some(k)) if *p == *k => Self::match_words(&pattern[1..], &key[1..]),
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoutingPattern {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
#[path = "pattern_tests.rs"]
mod tests;
