// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

use std::time::Instant;

use super::*;
use crate::device::{DeviceKind, DeviceStatus};
use crate::frame::Position;

fn device(id: &str) -> Device {
    Device {
        id: id.to_owned(),
        kind: DeviceKind::Agent,
        address: "10.0.0.1".to_owned(),
        reply_tcp_port: 9999,
        position: Position { x: 0.0, y: 0.0, z: 0.0 },
        battery: 100.0,
        status: DeviceStatus::Ready,
        last_seen: Instant::now(),
        assignment: None,
    }
}

fn state() -> State {
    State { kind: IssueKind::Rust, bucket: Bucket::Near }
}

#[test]
fn bucket_boundaries_match_spec() {
    assert_eq!(Bucket::from_distance(0.0), Bucket::Near);
    assert_eq!(Bucket::from_distance(29.9), Bucket::Near);
    assert_eq!(Bucket::from_distance(30.0), Bucket::Medium);
    assert_eq!(Bucket::from_distance(59.9), Bucket::Medium);
    assert_eq!(Bucket::from_distance(60.0), Bucket::Far);
}

#[test]
fn unseen_state_reads_as_zero() {
    let table = QTable::default();
    assert_eq!(table.get(&state(), "agent-1"), 0.0);
}

#[test]
fn update_moves_value_toward_reward() {
    let mut table = QTable::default();
    table.update(state(), "agent-1", -10.0, 0.5);
    assert_eq!(table.get(&state(), "agent-1"), -5.0);
    table.update(state(), "agent-1", -10.0, 0.5);
    assert_eq!(table.get(&state(), "agent-1"), -7.5);
}

#[test]
fn exploitation_picks_highest_value_candidates() {
    let policy = PolicyEngine::new(0.0, 0.1, 0.0, "unused.bin");
    let mut table = QTable::default();
    table.update(state(), "low", -100.0, 1.0);
    table.update(state(), "high", -1.0, 1.0);

    let candidates =
        vec![Candidate { device: device("low"), state: state() }, Candidate { device: device("high"), state: state() }];
    let selected = policy.select(&candidates, 1, &table);
    assert_eq!(selected, vec![1]);
}

#[test]
fn exploration_picks_a_subset_of_the_requested_size() {
    let policy = PolicyEngine::new(1.0, 0.1, 0.0, "unused.bin");
    let table = QTable::default();
    let candidates = vec![
        Candidate { device: device("a"), state: state() },
        Candidate { device: device("b"), state: state() },
        Candidate { device: device("c"), state: state() },
    ];
    let selected = policy.select(&candidates, 2, &table);
    assert_eq!(selected.len(), 2);
}

#[test]
fn select_never_exceeds_available_candidates() {
    let policy = PolicyEngine::new(0.0, 0.1, 0.0, "unused.bin");
    let table = QTable::default();
    let candidates = vec![Candidate { device: device("a"), state: state() }];
    let selected = policy.select(&candidates, 5, &table);
    assert_eq!(selected.len(), 1);
}

#[tokio::test]
async fn snapshot_round_trips_through_atomic_rename() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("qtable.bin");

    let policy = PolicyEngine::new(0.0, 0.5, 1.0, path.clone());
    policy.update(state(), "agent-1", -20.0).await;

    let reloaded = PolicyEngine::new(0.0, 0.5, 1.0, path.clone());
    reloaded.load().await;
    let table = reloaded.table.read().await;
    assert_eq!(table.get(&state(), "agent-1"), -10.0);
}

#[tokio::test]
async fn missing_snapshot_file_starts_from_zero() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("does-not-exist.bin");
    let policy = PolicyEngine::new(0.0, 0.1, 0.0, path.clone());
    policy.load().await;
    let table = policy.table.read().await;
    assert_eq!(table.get(&state(), "agent-1"), 0.0);
}

#[tokio::test]
async fn corrupt_snapshot_file_is_ignored() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("corrupt.bin");
    tokio::fs::write(&path, b"not a q-table").await.expect("write");

    let policy = PolicyEngine::new(0.0, 0.1, 0.0, path.clone());
    policy.load().await;
    let table = policy.table.read().await;
    assert_eq!(table.get(&state(), "agent-1"), 0.0);
}
