// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::Arc;
use weir_core::FakeClock;

#[test]
fn user_wait_accepts_signal_and_api() {
    let wait = Wait::user();
    assert!(wait.matches(&CatchTrigger::Api));
    assert!(wait.matches(&CatchTrigger::Signal { reference: None }));
    assert!(!wait.matches(&CatchTrigger::Error { code: None }));
}

#[test]
fn signal_wait_matches_by_reference() {
    let wait = Wait {
        specs: vec![EventDefinitionSpec::Signal {
            signal_ref: Some("go".to_string()),
        }],
        ..Wait::default()
    };
    assert!(wait.matches(&CatchTrigger::Signal {
        reference: Some("go".to_string())
    }));
    assert!(!wait.matches(&CatchTrigger::Signal {
        reference: Some("other".to_string())
    }));
    // an unreferenced broadcast reaches referenced waits
    assert!(wait.matches(&CatchTrigger::Signal { reference: None }));
}

#[test]
fn uncoded_error_wait_catches_any_code() {
    let wait = Wait {
        specs: vec![EventDefinitionSpec::Error { error_code: None }],
        ..Wait::default()
    };
    assert!(wait.matches(&CatchTrigger::Error {
        code: Some("E1".to_string())
    }));
    assert!(wait.matches(&CatchTrigger::Error { code: None }));
}

#[test]
fn catching_timer_registers_in_the_shared_registry() {
    let clock = Arc::new(FakeClock::new());
    let environment = weir_core::Environment::new().with_clock(clock);
    let content = Content::for_element("wait", "intermediateCatchEvent").with_execution("wait_1");

    let wait = execute_catching(
        &[EventDefinitionSpec::Timer {
            delay_ms: 50,
            repeat: None,
        }],
        &content,
        &environment,
    );
    assert_eq!(wait.timer_ids.len(), 1);
    let pending = environment.timers.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].owner, "wait_1");
    assert!(wait.matches(&CatchTrigger::Timer {
        timer_id: wait.timer_ids[0].clone()
    }));
}

#[test]
fn throwing_error_definition_raises_bpmn_error() {
    let content = Content::for_element("bad-end", "endEvent");
    let outcome = execute_throwing(
        &[EventDefinitionSpec::Error {
            error_code: Some("E42".to_string()),
        }],
        &content,
    );
    match outcome {
        ThrowOutcome::Error(err) => {
            assert_eq!(err.name, "bad-end");
            assert_eq!(err.code.as_deref(), Some("E42"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn throwing_signal_delegates() {
    let content = Content::for_element("emit", "intermediateThrowEvent");
    let outcome = execute_throwing(
        &[EventDefinitionSpec::Signal {
            signal_ref: Some("go".to_string()),
        }],
        &content,
    );
    match outcome {
        ThrowOutcome::Thrown(events) => {
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].routing_key, "activity.signal");
            assert!(events[0].delegate);
            assert_eq!(events[0].reference.as_deref(), Some("go"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn terminate_wins_over_other_definitions() {
    let content = Content::for_element("end", "endEvent");
    let outcome = execute_throwing(&[EventDefinitionSpec::Terminate], &content);
    assert_eq!(outcome, ThrowOutcome::Terminate);
}
