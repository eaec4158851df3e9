// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn default_flags_stay_out_of_json() {
    let msg = Message::new("run.enter", Content::for_element("task", "task"));
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["fields"]["routingKey"], "run.enter");
    assert!(json["fields"].get("redelivered").is_none());
    assert!(json["properties"].get("persistent").is_none());
}

#[test]
fn message_round_trips() {
    let mut msg = Message::new("run.execute", Content::for_element("task", "userTask"));
    msg.fields.redelivered = true;
    msg.properties.persistent = true;
    msg.properties.message_id = "m_9".to_string();

    let json = serde_json::to_string(&msg).unwrap();
    let back: Message = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msg);
    assert!(back.redelivered());
}
