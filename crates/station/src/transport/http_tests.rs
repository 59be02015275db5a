// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use axum_test::TestServer;
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

fn harness() -> TestServer {
    let coordinator = Arc::new(Coordinator::new(StationConfig::for_test(), CancellationToken::new()));
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&coordinator), Arc::new(NoopSink)));
    let router = build_router(HttpState { coordinator, dispatcher });
    TestServer::new(router).expect("test server")
}

#[tokio::test]
async fn health_reports_device_count() {
    let server = harness();
    let response = server.get("/api/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["device_count"], 0);
}

#[tokio::test]
async fn roster_reflects_upserted_devices() {
    let coordinator = Arc::new(Coordinator::new(StationConfig::for_test(), CancellationToken::new()));
    coordinator
        .registry
        .upsert("drone-1", UpsertFields { kind: Some(DeviceKind::Drone), address: Some("10.0.0.1".into()), ..Default::default() })
        .await;
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&coordinator), Arc::new(NoopSink)));
    let router = build_router(HttpState { coordinator, dispatcher });
    let server = TestServer::new(router).expect("test server");

    let response = server.get("/api/roster").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().expect("array").len(), 1);
}

#[tokio::test]
async fn synthesize_issue_accepts_a_known_kind() {
    let server = harness();
    let response = server.post("/api/synthesize/rust").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["synthesized"], "rust");
}

#[tokio::test]
async fn synthesize_issue_rejects_an_unknown_kind() {
    let server = harness();
    let response = server.post("/api/synthesize/not_a_real_kind").await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn network_logs_clear_empties_the_ring() {
    let server = harness();
    server.post("/api/synthesize/rust").await.assert_status_ok();
    server.post("/api/network-logs/clear").await.assert_status_ok();
    let response = server.get("/api/network-logs").await;
    let body: serde_json::Value = response.json();
    assert_eq!(body.as_array().expect("array").len(), 0);
}
