// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn message() -> Content {
    Content::for_element("timer", "intermediateCatchEvent")
}

#[test]
fn timers_fire_when_due() {
    let timers = Timers::new();
    let start = Instant::now();
    timers.set_timeout("t_1", Duration::from_millis(100), None, message(), start);

    assert!(timers.expired(start).is_empty());
    let due = timers.expired(start + Duration::from_millis(100));
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].owner, "t_1");
    assert!(timers.pending().is_empty());
}

#[test]
fn repeating_timers_rearm_until_exhausted() {
    let timers = Timers::new();
    let start = Instant::now();
    timers.set_timeout("t_1", Duration::from_millis(10), Some(2), message(), start);

    let first = timers.expired(start + Duration::from_millis(10));
    assert_eq!(first.len(), 1);
    assert_eq!(timers.pending().len(), 1);

    let second = timers.expired(start + Duration::from_millis(20));
    assert_eq!(second.len(), 1);
    assert!(timers.pending().is_empty());
}

#[test]
fn clear_owner_cancels_pending_timers() {
    let timers = Timers::new();
    let start = Instant::now();
    timers.set_timeout("t_1", Duration::from_millis(10), None, message(), start);
    timers.set_timeout("t_2", Duration::from_millis(10), None, message(), start);

    timers.clear_owner("t_1");
    let due = timers.expired(start + Duration::from_millis(10));
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].owner, "t_2");
}
