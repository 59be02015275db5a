// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::config::StationConfig;
use crate::device::{Device, DeviceKind};
use crate::dispatcher::{CommandSink, Dispatcher};
use crate::error::StationError;
use crate::registry::UpsertFields;

struct NoopSink;

impl CommandSink for NoopSink {
    fn send<'a>(
        &'a self,
        _device: &'a Device,
        _payload: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), StationError>> + Send + 'a>> {
        Box::pin(async { Ok(()) })
    }
}

async fn harness() -> (Arc<Coordinator>, Arc<Dispatcher>, Arc<Reconciler>) {
    let coordinator = Arc::new(Coordinator::new(StationConfig::for_test(), CancellationToken::new()));
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&coordinator), Arc::new(NoopSink)));
    let reconciler = Arc::new(Reconciler::new(Arc::clone(&coordinator), Arc::clone(&dispatcher)));
    (coordinator, dispatcher, reconciler)
}

#[tokio::test]
async fn qr_scan_line_produces_a_pending_issue() {
    let (coordinator, dispatcher, reconciler) = harness().await;
    let line = r#"{"message_type":"QR_SCAN","content":{"qr_code":"r1","issue_type":"rust","coordinates":{"x":1.0,"y":1.0,"z":0.0}}}"#;

    handle_line(&coordinator, &dispatcher, &reconciler, line, "10.0.0.5").await;

    assert_eq!(coordinator.issues.len().await, 1);
    assert_eq!(coordinator.queue.len().await, 1);
}

#[tokio::test]
async fn task_completed_line_is_routed_to_the_reconciler() {
    let (coordinator, dispatcher, reconciler) = harness().await;
    coordinator
        .registry
        .upsert("agent-1", UpsertFields { kind: Some(DeviceKind::Agent), address: Some("10.0.0.5".into()), ..Default::default() })
        .await;
    coordinator.registry.assign("agent-1", 1).await;
    let task = crate::task::Task::new(
        1,
        "agent-1".into(),
        crate::issue::IssueKind::Rust,
        crate::frame::Position { x: 0.0, y: 0.0, z: 0.0 },
        crate::policy::Bucket::Near,
        std::time::Instant::now(),
    );
    coordinator.active_tasks.write().await.insert(1, task);

    let line = r#"{"message_type":"TASK_COMPLETED","sender_id":"agent-1","content":{"task_id":"1","issue_type":"rust","coordinates":{"x":0.0,"y":0.0,"z":0.0},"status":"completed"}}"#;
    handle_line(&coordinator, &dispatcher, &reconciler, line, "10.0.0.5").await;

    assert!(coordinator.active_tasks.read().await.is_empty());
    assert!(!coordinator.registry.get("agent-1").await.expect("present").is_assigned());
}

#[tokio::test]
async fn malformed_line_is_dropped_without_panicking() {
    let (coordinator, dispatcher, reconciler) = harness().await;
    handle_line(&coordinator, &dispatcher, &reconciler, "not json at all", "10.0.0.5").await;
    assert_eq!(coordinator.issues.len().await, 0);
}

#[tokio::test]
async fn forward_to_falls_back_to_address_lookup_when_id_is_unknown() {
    let (coordinator, _dispatcher, _reconciler) = harness().await;
    coordinator
        .registry
        .upsert("agent-1", UpsertFields { kind: Some(DeviceKind::Agent), address: Some("10.0.0.5".into()), ..Default::default() })
        .await;

    // receiver_id does not match the device's id, only its address.
    forward_to(&coordinator, "10.0.0.5", serde_json::json!({"note": "hi"})).await;

    let recent = coordinator.network_log.recent().await;
    assert!(recent.iter().any(|entry| entry.message_type == "FORWARD_TO"));
}

#[tokio::test]
async fn forward_to_unknown_target_is_a_silent_no_op() {
    let (coordinator, _dispatcher, _reconciler) = harness().await;
    forward_to(&coordinator, "nobody", serde_json::json!({})).await;
    assert!(coordinator.network_log.recent().await.is_empty());
}

#[tokio::test]
async fn bind_fails_when_the_port_is_already_taken() {
    let held = bind("127.0.0.1:0").await.expect("first bind");
    let addr = held.local_addr().expect("addr").to_string();

    let result = bind(&addr).await;
    assert!(result.is_err(), "second bind on the same port must fail, not hang or silently succeed");
}

#[tokio::test]
async fn forward_all_still_reaches_an_agent_mid_task() {
    let (coordinator, _dispatcher, _reconciler) = harness().await;
    coordinator
        .registry
        .upsert("agent-1", UpsertFields { kind: Some(DeviceKind::Agent), address: Some("10.0.0.5".into()), ..Default::default() })
        .await;
    assert!(coordinator.registry.assign("agent-1", 1).await);

    forward_all(&coordinator, "agent", serde_json::json!({"note": "broadcast"})).await;

    let recent = coordinator.network_log.recent().await;
    assert!(recent.iter().any(|entry| entry.message_type == "FORWARD_ALL" && entry.peer == "agent-1"));
}
