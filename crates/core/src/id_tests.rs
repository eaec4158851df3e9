// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn uuid_gen_creates_unique_ids() {
    let ids = UuidIdGen;
    assert_ne!(ids.next(), ids.next());
}

#[test]
fn sequential_gen_is_shared_across_clones() {
    let ids = SequentialIdGen::new();
    let other = ids.clone();
    assert_eq!(ids.next(), "0");
    assert_eq!(other.next(), "1");
    assert_eq!(ids.next(), "2");
}

#[test]
fn execution_id_prefixes_the_element() {
    let ids = SequentialIdGen::new();
    assert_eq!(execution_id("task", &ids), "task_0");
    assert_eq!(execution_id("task", &ids), "task_1");
}
