// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn bpmn_error_displays_code() {
    let err = BpmnError::new("OrderRejected", Some("E42".to_string()));
    assert_eq!(err.to_string(), "OrderRejected (E42)");
    assert_eq!(BpmnError::new("Plain", None).to_string(), "Plain");
}

#[test]
fn error_detail_round_trips_tagged() {
    let detail: ErrorDetail = ActivityError::new("task", "boom")
        .with_inner(BpmnError::new("Biz", Some("c1".to_string())))
        .into();
    let json = serde_json::to_value(&detail).expect("serialize");
    assert_eq!(json["kind"], "activityError");

    let back: ErrorDetail = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, detail);
    assert_eq!(back.code(), Some("c1"));
}
