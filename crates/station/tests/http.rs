// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! End-to-end HTTP surface tests, driving the router from outside the
//! crate the way an operator dashboard would.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum_test::TestServer;
use tokio_util::sync::CancellationToken;

use station::config::StationConfig;
use station::device::{Device, DeviceKind};
use station::dispatcher::{CommandSink, Dispatcher};
use station::error::StationError;
use station::registry::UpsertFields;
use station::state::Coordinator;
use station::transport::{build_router, HttpState};

struct RecordingSink {
    sent: std::sync::atomic::AtomicUsize,
}

impl CommandSink for RecordingSink {
    fn send<'a>(
        &'a self,
        _device: &'a Device,
        _payload: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), StationError>> + Send + 'a>> {
        self.sent.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Box::pin(async { Ok(()) })
    }
}

fn server_with(coordinator: Arc<Coordinator>, dispatcher: Arc<Dispatcher>) -> TestServer {
    let router = build_router(HttpState { coordinator, dispatcher });
    TestServer::new(router).expect("test server")
}

#[tokio::test]
async fn overview_reflects_a_synthesized_issue_being_dispatched() {
    let coordinator = Arc::new(Coordinator::new(StationConfig::for_test(), CancellationToken::new()));
    coordinator
        .registry
        .upsert(
            "agent-1",
            UpsertFields { kind: Some(DeviceKind::Agent), address: Some("10.0.0.1".into()), ..Default::default() },
        )
        .await;
    let sink = Arc::new(RecordingSink { sent: std::sync::atomic::AtomicUsize::new(0) });
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&coordinator), sink.clone()));
    let server = server_with(Arc::clone(&coordinator), Arc::clone(&dispatcher));

    server.post("/api/synthesize/rust").await.assert_status_ok();

    let overview: serde_json::Value = server.get("/api/overview").await.json();
    assert_eq!(overview["assigned_count"], 1);
    assert_eq!(overview["pending_issue_count"], 0);
    assert_eq!(sink.sent.load(std::sync::atomic::Ordering::SeqCst), 1);

    let commands: serde_json::Value = server.get("/api/commands").await.json();
    assert_eq!(commands.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn overview_queues_an_issue_when_no_agents_are_free() {
    let coordinator = Arc::new(Coordinator::new(StationConfig::for_test(), CancellationToken::new()));
    let sink = Arc::new(RecordingSink { sent: std::sync::atomic::AtomicUsize::new(0) });
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&coordinator), sink));
    let server = server_with(Arc::clone(&coordinator), dispatcher);

    server.post("/api/synthesize/overheated_circuit").await.assert_status_ok();

    let overview: serde_json::Value = server.get("/api/overview").await.json();
    assert_eq!(overview["pending_issue_count"], 1);

    let issues: serde_json::Value = server.get("/api/issues").await.json();
    assert_eq!(issues.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn health_and_roster_agree_on_device_count() {
    let coordinator = Arc::new(Coordinator::new(StationConfig::for_test(), CancellationToken::new()));
    coordinator
        .registry
        .upsert("drone-1", UpsertFields { kind: Some(DeviceKind::Drone), address: Some("10.0.0.2".into()), ..Default::default() })
        .await;
    let sink = Arc::new(RecordingSink { sent: std::sync::atomic::AtomicUsize::new(0) });
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&coordinator), sink));
    let server = server_with(coordinator, dispatcher);

    let health: serde_json::Value = server.get("/api/health").await.json();
    let roster: serde_json::Value = server.get("/api/roster").await.json();
    assert_eq!(health["device_count"], 1);
    assert_eq!(roster.as_array().expect("array").len(), 1);
}
