// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution id minting
//!
//! Every run of an element gets a fresh `<elementId>_<random>` execution id so
//! concurrent and looped instances of the same element stay distinguishable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Generates unique id suffixes.
///
/// Object safe so the environment can carry one generator for all scopes; the
/// sequential implementation makes event sequences deterministic in tests.
pub trait IdGen: Send + Sync {
    fn next(&self) -> String;
}

/// Mint an execution id for an element.
pub fn execution_id(element_id: &str, ids: &dyn IdGen) -> String {
    format!("{}_{}", element_id, ids.next())
}

/// UUID-based generator for production use
#[derive(Clone, Copy, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        // Compact the UUID: the element id prefix already gives readability.
        uuid::Uuid::new_v4().simple().to_string()
    }
}

/// Sequential generator for deterministic tests
#[derive(Clone)]
pub struct SequentialIdGen {
    counter: Arc<AtomicU64>,
}

impl SequentialIdGen {
    pub fn new() -> Self {
        Self {
            counter: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl Default for SequentialIdGen {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("{}", n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
