// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! Discovery/status datagram listener (§4.1): `CONNECTION_REQUEST`,
//! `HEARTBEAT`, `POSITION_UPDATE`. Malformed frames are dropped and counted;
//! no reply is sent on this socket.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::device::{DeviceKind, DeviceStatus};
use crate::frame::{connection_ack, Frame};
use crate::registry::UpsertFields;
use crate::state::Coordinator;
use crate::transport::tcp_out::send_line;

/// Binds the discovery socket synchronously so a port conflict surfaces to
/// the caller immediately, before the accept loop is backgrounded.
pub async fn bind(addr: &str) -> anyhow::Result<UdpSocket> {
    let socket = UdpSocket::bind(addr).await?;
    info!(addr, "discovery listener bound");
    Ok(socket)
}

pub async fn serve(coordinator: Arc<Coordinator>, socket: UdpSocket) -> anyhow::Result<()> {
    let mut buf = vec![0u8; 4096];
    loop {
        tokio::select! {
            _ = coordinator.shutdown.cancelled() => {
                info!("discovery listener shutting down");
                return Ok(());
            }
            recv = socket.recv_from(&mut buf) => {
                let (n, peer) = match recv {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(%err, "discovery socket recv error");
                        continue;
                    }
                };
                let raw = String::from_utf8_lossy(&buf[..n]).into_owned();
                let coordinator = Arc::clone(&coordinator);
                let peer_ip = peer.ip().to_string();
                tokio::spawn(async move {
                    handle_datagram(&coordinator, &raw, &peer_ip).await;
                });
            }
        }
    }
}

async fn handle_datagram(coordinator: &Arc<Coordinator>, raw: &str, peer_ip: &str) {
    let frame = match Frame::decode(raw, peer_ip) {
        Ok(frame) => frame,
        Err(reason) => {
            debug!(%reason, "dropped malformed discovery frame");
            return;
        }
    };

    match frame {
        Frame::ConnectionRequest { device_id, device_type, sender_ip, reply_tcp_port, position } => {
            handle_connection_request(
                coordinator,
                device_id,
                device_type,
                sender_ip,
                reply_tcp_port,
                position,
            )
            .await;
        }
        Frame::Heartbeat { device_id, sender_ip, battery_health } => {
            match device_id {
                Some(id) => {
                    coordinator
                        .registry
                        .upsert(&id, UpsertFields { battery: Some(battery_health), ..Default::default() })
                        .await;
                }
                None => {
                    coordinator.registry.touch_by_address(&sender_ip, Some(battery_health)).await;
                }
            }
        }
        Frame::PositionUpdate { device_id, sender_ip, position } => {
            // §6: position updates are not logged in the network ring.
            match device_id {
                Some(id) => {
                    coordinator
                        .registry
                        .upsert(&id, UpsertFields { position: Some(position), ..Default::default() })
                        .await;
                }
                None => {
                    coordinator.registry.touch_by_address(&sender_ip, None).await;
                }
            }
        }
        other => {
            debug!(message_type = other.message_type(), "frame type not valid on discovery socket, dropped");
        }
    }
}

async fn handle_connection_request(
    coordinator: &Arc<Coordinator>,
    device_id: String,
    device_type: String,
    sender_ip: String,
    reply_tcp_port: u16,
    position: crate::frame::Position,
) {
    let ack = connection_ack(&coordinator.config.host, &device_id, &sender_ip);
    let status = match send_line(&sender_ip, reply_tcp_port, &ack, coordinator.config.connect_timeout()).await {
        Ok(()) => DeviceStatus::Connected,
        Err(err) => {
            warn!(device_id = %device_id, %err, "connection ack send failed");
            DeviceStatus::AckFailed(err.to_string())
        }
    };
    coordinator.network_log.push("in", sender_ip.clone(), "CONNECTION_REQUEST").await;
    coordinator
        .registry
        .upsert(
            &device_id,
            UpsertFields {
                kind: Some(DeviceKind::parse(&device_type)),
                address: Some(sender_ip.clone()),
                reply_tcp_port: Some(reply_tcp_port),
                position: Some(position),
                status: Some(status),
                ..Default::default()
            },
        )
        .await;
    info!(device_id = %device_id, device_type = %device_type, "device connected");
}

#[cfg(test)]
#[path = "udp_tests.rs"]
mod tests;
