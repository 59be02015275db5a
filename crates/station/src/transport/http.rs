// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! HTTP handlers for the read-only status surface (§4.8, §6).

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::device::DeviceView;
use crate::error::StationError;
use crate::frame::Position;
use crate::issue::{Issue, IssueKind};
use crate::logs::{CommandEntry, FrameEntry};
use crate::transport::HttpState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub device_count: usize,
}

pub async fn health(State(state): State<HttpState>) -> Json<HealthResponse> {
    let device_count = state.coordinator.registry.len().await;
    Json(HealthResponse { status: "ok", device_count })
}

pub async fn roster(State(state): State<HttpState>) -> Json<Vec<DeviceView>> {
    let devices = state.coordinator.registry.snapshot().await;
    Json(devices.iter().map(DeviceView::from).collect())
}

#[derive(Debug, Serialize)]
pub struct OverviewResponse {
    pub drones: Vec<DeviceView>,
    pub agents: Vec<DeviceView>,
    pub assigned_count: usize,
    pub pending_issue_count: usize,
}

pub async fn overview(State(state): State<HttpState>) -> Json<OverviewResponse> {
    let devices = state.coordinator.registry.snapshot().await;
    let views: Vec<DeviceView> = devices.iter().map(DeviceView::from).collect();
    let drones = views.iter().filter(|v| matches!(v.kind, crate::device::DeviceKind::Drone)).cloned().collect();
    let agents = views.iter().filter(|v| matches!(v.kind, crate::device::DeviceKind::Agent)).cloned().collect();
    let assigned_count = views.iter().filter(|v| v.assigned_task.is_some()).count();
    let pending_issue_count = state.coordinator.queue.len().await;
    Json(OverviewResponse { drones, agents, assigned_count, pending_issue_count })
}

pub async fn open_issues(State(state): State<HttpState>) -> Json<Vec<Issue>> {
    Json(state.coordinator.issues.snapshot().await)
}

pub async fn recent_frames(State(state): State<HttpState>) -> Json<Vec<FrameEntry>> {
    Json(state.coordinator.network_log.recent().await)
}

pub async fn recent_commands(State(state): State<HttpState>) -> Json<Vec<CommandEntry>> {
    Json(state.coordinator.command_log.recent().await)
}

pub async fn clear_frames(State(state): State<HttpState>) -> impl IntoResponse {
    state.coordinator.network_log.clear().await;
    Json(serde_json::json!({ "cleared": true }))
}

/// Preconfigured coordinate table for manual testing, one per issue kind
/// (§4.8, §6). Not derived from any live sensor.
fn synthetic_coordinate(kind: &IssueKind) -> Position {
    match kind {
        IssueKind::Rust => Position { x: 10.0, y: 10.0, z: 0.0 },
        IssueKind::OverheatedCircuit => Position { x: 40.0, y: -15.0, z: 2.0 },
        IssueKind::TiltedAntenna => Position { x: -25.0, y: 70.0, z: 5.0 },
        IssueKind::Other(_) => Position { x: 0.0, y: 0.0, z: 0.0 },
    }
}

pub async fn synthesize_issue(
    State(state): State<HttpState>,
    Path(kind): Path<String>,
) -> Result<Json<serde_json::Value>, (axum::http::StatusCode, Json<crate::error::ErrorResponse>)> {
    let kind = IssueKind::parse(&kind);
    if matches!(kind, IssueKind::Other(_)) {
        let (status, body) = StationError::BadRequest.to_http_response("unknown issue kind");
        return Err((status, body));
    }
    let coordinate = synthetic_coordinate(&kind);
    let issue = Issue::new(kind.clone(), coordinate, None, crate::frame::epoch_seconds(), None);
    state.dispatcher.on_issue(issue).await;
    Ok(Json(serde_json::json!({ "synthesized": kind.as_str(), "coordinate": coordinate })))
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
