// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer registry
//!
//! The engine never blocks on time. A timer behavior registers a delay here
//! and returns; the host polls `expired(now)` (or a scheduler wakes it) and
//! feeds due timers back into the definition through the api exchange.
//! Timers are not part of snapshots; behaviors re-register them on resume.

use crate::message::Content;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A pending timer
#[derive(Debug, Clone)]
pub struct RegisteredTimer {
    pub id: String,
    /// Execution id of the behavior that set the timer
    pub owner: String,
    pub delay: Duration,
    pub due: Instant,
    /// Remaining repeats after this fire
    pub repeat: Option<u32>,
    pub message: Content,
}

#[derive(Default)]
struct Inner {
    seq: u64,
    active: Vec<RegisteredTimer>,
}

/// Shared timer registry, one per definition
#[derive(Clone, Default)]
pub struct Timers {
    inner: Arc<Mutex<Inner>>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a timeout; returns the timer id
    pub fn set_timeout(
        &self,
        owner: impl Into<String>,
        delay: Duration,
        repeat: Option<u32>,
        message: Content,
        now: Instant,
    ) -> String {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.seq += 1;
        let id = format!("timer_{}", inner.seq);
        inner.active.push(RegisteredTimer {
            id: id.clone(),
            owner: owner.into(),
            delay,
            due: now + delay,
            repeat,
            message,
        });
        id
    }

    pub fn clear_timeout(&self, id: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.active.retain(|t| t.id != id);
    }

    /// Cancel every timer set by the given execution, e.g. on stop/discard
    pub fn clear_owner(&self, owner: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.active.retain(|t| t.owner != owner);
    }

    /// Drain timers that are due; repeating timers re-register themselves
    pub fn expired(&self, now: Instant) -> Vec<RegisteredTimer> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let mut due = Vec::new();
        let mut keep = Vec::new();
        for timer in inner.active.drain(..) {
            if timer.due <= now {
                if let Some(repeat) = timer.repeat.filter(|r| *r > 1) {
                    keep.push(RegisteredTimer {
                        due: now + timer.delay,
                        repeat: Some(repeat - 1),
                        ..timer.clone()
                    });
                }
                due.push(timer);
            } else {
                keep.push(timer);
            }
        }
        inner.active = keep;
        due
    }

    pub fn pending(&self) -> Vec<RegisteredTimer> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .active
            .clone()
    }
}

#[cfg(test)]
#[path = "timers_tests.rs"]
mod tests;
