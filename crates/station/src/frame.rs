// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! Wire envelope and the tagged frame decoder.
//!
//! Devices speak a duck-typed JSON envelope (see `original_source/`): the set
//! of fields that matter depends on `message_type`, and some frames carry a
//! nested `content` object while others (notably `CONNECTION_ACK`) don't.
//! `RawEnvelope` captures the envelope as deserde sees it; `Frame::decode`
//! turns it into a typed, validated variant so downstream code never touches
//! raw JSON again.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::DropReason;
use crate::issue::IssueKind;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    /// 2D Euclidean distance, per the bucket distance defined in §4.5.
    pub fn distance_2d(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Raw shape of an inbound JSON frame, before validation. Optional fields are
/// simply absent for message types that don't use them.
#[derive(Debug, Deserialize)]
pub struct RawEnvelope {
    #[serde(default)]
    pub message_id: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<f64>,
    pub message_type: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub sender_ip: Option<String>,
    #[serde(default)]
    pub reply_tcp_port: Option<u16>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub battery_health: Option<f64>,
    #[serde(default)]
    pub receiver_category: Option<String>,
    #[serde(default)]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

/// A validated, typed inbound frame. Unknown `message_type` or missing
/// required fields are rejected at this boundary (§9 "duck-typed JSON
/// frames" design note) — everything downstream operates on these variants.
#[derive(Debug, Clone)]
pub enum Frame {
    ConnectionRequest {
        device_id: String,
        device_type: String,
        sender_ip: String,
        reply_tcp_port: u16,
        position: Position,
    },
    Heartbeat {
        device_id: Option<String>,
        sender_ip: String,
        battery_health: f64,
    },
    PositionUpdate {
        device_id: Option<String>,
        sender_ip: String,
        position: Position,
    },
    QrScan {
        sender_id: Option<String>,
        qr_code: Option<String>,
        issue_type: IssueKind,
        coordinates: Position,
        api_data: Option<serde_json::Value>,
    },
    TaskCompleted {
        sender_id: Option<String>,
        task_id: String,
        issue_type: IssueKind,
        coordinates: Position,
        status: String,
        message: Option<String>,
    },
    ForwardAll {
        receiver_category: String,
        content: serde_json::Value,
    },
    ForwardTo {
        receiver_id: String,
        content: serde_json::Value,
    },
}

impl Frame {
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::ConnectionRequest { .. } => "CONNECTION_REQUEST",
            Self::Heartbeat { .. } => "HEARTBEAT",
            Self::PositionUpdate { .. } => "POSITION_UPDATE",
            Self::QrScan { .. } => "QR_SCAN",
            Self::TaskCompleted { .. } => "TASK_COMPLETED",
            Self::ForwardAll { .. } => "FORWARD_ALL",
            Self::ForwardTo { .. } => "FORWARD_TO",
        }
    }

    /// Parse and validate a single newline-stripped JSON line or datagram.
    pub fn decode(raw: &str, fallback_ip: &str) -> Result<Frame, DropReason> {
        let env: RawEnvelope =
            serde_json::from_str(raw).map_err(|_| DropReason::MalformedJson)?;
        Self::from_envelope(env, fallback_ip)
    }

    fn from_envelope(env: RawEnvelope, fallback_ip: &str) -> Result<Frame, DropReason> {
        match env.message_type.as_str() {
            "CONNECTION_REQUEST" => {
                let device_id =
                    env.device_id.ok_or(DropReason::MissingField("device_id"))?;
                let device_type = env.device_type.unwrap_or_else(|| "unknown".to_owned());
                let sender_ip = env.sender_ip.unwrap_or_else(|| fallback_ip.to_owned());
                let reply_tcp_port =
                    env.reply_tcp_port.ok_or(DropReason::MissingField("reply_tcp_port"))?;
                let position = env.position.ok_or(DropReason::MissingField("position"))?;
                Ok(Frame::ConnectionRequest {
                    device_id,
                    device_type,
                    sender_ip,
                    reply_tcp_port,
                    position,
                })
            }
            "HEARTBEAT" => {
                let sender_ip = env.sender_ip.unwrap_or_else(|| fallback_ip.to_owned());
                let battery_health = env.battery_health.unwrap_or(100.0);
                Ok(Frame::Heartbeat { device_id: env.device_id, sender_ip, battery_health })
            }
            "POSITION_UPDATE" => {
                let sender_ip = env.sender_ip.unwrap_or_else(|| fallback_ip.to_owned());
                let position = env.position.ok_or(DropReason::MissingField("position"))?;
                Ok(Frame::PositionUpdate { device_id: env.device_id, sender_ip, position })
            }
            "QR_SCAN" => {
                let content = env.content.ok_or(DropReason::MissingField("content"))?;
                let issue_type = content
                    .get("issue_type")
                    .and_then(|v| v.as_str())
                    .ok_or(DropReason::MissingField("issue_type"))?;
                let issue_type = IssueKind::parse(issue_type);
                let coordinates: Position = content
                    .get("coordinates")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|_| DropReason::MissingField("coordinates"))?
                    .ok_or(DropReason::MissingField("coordinates"))?;
                let qr_code =
                    content.get("qr_code").and_then(|v| v.as_str()).map(str::to_owned);
                let api_data = content.get("api_data").cloned();
                Ok(Frame::QrScan {
                    sender_id: env.sender_id,
                    qr_code,
                    issue_type,
                    coordinates,
                    api_data,
                })
            }
            "TASK_COMPLETED" => {
                let content = env.content.ok_or(DropReason::MissingField("content"))?;
                let task_id = content
                    .get("task_id")
                    .and_then(|v| v.as_str())
                    .ok_or(DropReason::MissingField("task_id"))?
                    .to_owned();
                let issue_type = content
                    .get("issue_type")
                    .and_then(|v| v.as_str())
                    .map(IssueKind::parse)
                    .ok_or(DropReason::MissingField("issue_type"))?;
                let coordinates: Position = content
                    .get("coordinates")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|_| DropReason::MissingField("coordinates"))?
                    .ok_or(DropReason::MissingField("coordinates"))?;
                let status = content
                    .get("status")
                    .and_then(|v| v.as_str())
                    .unwrap_or("completed")
                    .to_owned();
                let message =
                    content.get("message").and_then(|v| v.as_str()).map(str::to_owned);
                Ok(Frame::TaskCompleted {
                    sender_id: env.sender_id,
                    task_id,
                    issue_type,
                    coordinates,
                    status,
                    message,
                })
            }
            "FORWARD_ALL" => {
                let receiver_category = env
                    .receiver_category
                    .ok_or(DropReason::MissingField("receiver_category"))?;
                let content = env.content.unwrap_or(serde_json::Value::Null);
                Ok(Frame::ForwardAll { receiver_category, content })
            }
            "FORWARD_TO" => {
                let receiver_id =
                    env.receiver_id.ok_or(DropReason::MissingField("receiver_id"))?;
                let content = env.content.unwrap_or(serde_json::Value::Null);
                Ok(Frame::ForwardTo { receiver_id, content })
            }
            other => Err(DropReason::UnknownMessageType(other.to_owned())),
        }
    }
}

pub fn epoch_seconds() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs_f64()
}

pub fn epoch_micros() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_micros() as u64
}

/// Build the outbound `CONNECTION_ACK` envelope (no `content` wrapper — these
/// fields sit at the top level, matching the original prototype).
pub fn connection_ack(base_station_ip: &str, receiver_id: &str, receiver_ip: &str) -> serde_json::Value {
    serde_json::json!({
        "message_id": epoch_micros().to_string(),
        "timestamp": epoch_seconds(),
        "message_type": "CONNECTION_ACK",
        "base_station_ip": base_station_ip,
        "receiver_id": receiver_id,
        "receiver_ip": receiver_ip,
    })
}

/// Build the outbound `MOVEMENT_COMMAND` envelope; `task_id` rides in
/// `message_id` per §6.
pub fn movement_command(
    task_id: u64,
    issue_type: IssueKind,
    coordinates: Position,
) -> serde_json::Value {
    serde_json::json!({
        "message_id": task_id.to_string(),
        "timestamp": epoch_seconds(),
        "message_type": "MOVEMENT_COMMAND",
        "content": {
            "issue_type": issue_type.as_str(),
            "coordinates": coordinates,
            "command": "move_to_location",
        },
    })
}

pub fn forward_frame(message_type: &str, content: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "message_id": epoch_micros().to_string(),
        "timestamp": epoch_seconds(),
        "message_type": message_type,
        "sender": "base_station",
        "content": content,
    })
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
