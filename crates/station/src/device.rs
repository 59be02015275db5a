// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::frame::Position;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Drone,
    Agent,
}

impl DeviceKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "robot" | "agent" => Self::Agent,
            _ => Self::Drone,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    Connected,
    AckFailed(String),
    Ready,
}

/// A registered drone or ground agent. Created on a successful `CONNECTION_ACK`;
/// mutated in place by heartbeat/position/assign/release; destroyed on
/// eviction or loss of its inbound stream (§4.2).
#[derive(Debug, Clone)]
pub struct Device {
    pub id: String,
    pub kind: DeviceKind,
    pub address: String,
    pub reply_tcp_port: u16,
    pub position: Position,
    pub battery: f64,
    pub status: DeviceStatus,
    pub last_seen: Instant,
    pub assignment: Option<u64>,
}

impl Device {
    pub fn is_assigned(&self) -> bool {
        self.assignment.is_some()
    }
}

/// JSON-serializable snapshot of a device, for the status surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceView {
    pub id: String,
    pub kind: DeviceKind,
    pub address: String,
    pub position: Position,
    pub battery: f64,
    pub status: String,
    pub assigned_task: Option<u64>,
    pub last_seen_secs_ago: f64,
}

impl From<&Device> for DeviceView {
    fn from(d: &Device) -> Self {
        let status = match &d.status {
            DeviceStatus::Connected => "CONNECTED".to_owned(),
            DeviceStatus::AckFailed(reason) => format!("ACK_FAIL: {reason}"),
            DeviceStatus::Ready => "READY".to_owned(),
        };
        Self {
            id: d.id.clone(),
            kind: d.kind,
            address: d.address.clone(),
            position: d.position,
            battery: d.battery,
            status,
            assigned_task: d.assignment,
            last_seen_secs_ago: d.last_seen.elapsed().as_secs_f64(),
        }
    }
}
