// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! Inbound stream listener (§4.1): newline-delimited JSON from devices.
//! Each accepted connection is handled independently; frames within a
//! connection are processed in arrival order (§5).

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::frame::Frame;
use crate::issue::Issue;
use crate::reconciler::{CompletionReport, Reconciler};
use crate::state::Coordinator;
use crate::transport::tcp_out::send_line;

/// Binds the inbound stream listener synchronously so a port conflict
/// surfaces to the caller immediately, before the accept loop is
/// backgrounded.
pub async fn bind(addr: &str) -> anyhow::Result<TcpListener> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr, "inbound stream listener bound");
    Ok(listener)
}

pub async fn serve(
    coordinator: Arc<Coordinator>,
    dispatcher: Arc<Dispatcher>,
    reconciler: Arc<Reconciler>,
    listener: TcpListener,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            _ = coordinator.shutdown.cancelled() => {
                info!("inbound stream listener shutting down");
                return Ok(());
            }
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        warn!(%err, "accept failed");
                        continue;
                    }
                };
                let coordinator = Arc::clone(&coordinator);
                let dispatcher = Arc::clone(&dispatcher);
                let reconciler = Arc::clone(&reconciler);
                let peer_ip = peer.ip().to_string();
                tokio::spawn(async move {
                    handle_connection(coordinator, dispatcher, reconciler, stream, peer_ip).await;
                });
            }
        }
    }
}

async fn handle_connection(
    coordinator: Arc<Coordinator>,
    dispatcher: Arc<Dispatcher>,
    reconciler: Arc<Reconciler>,
    stream: TcpStream,
    peer_ip: String,
) {
    let idle_timeout = coordinator.config.idle_timeout();
    let mut reader = BufReader::new(stream).lines();
    loop {
        let next = tokio::time::timeout(idle_timeout, reader.next_line()).await;
        let line = match next {
            Ok(Ok(Some(line))) => line,
            Ok(Ok(None)) => {
                debug!(peer = %peer_ip, "inbound stream closed");
                break;
            }
            Ok(Err(err)) => {
                warn!(peer = %peer_ip, %err, "inbound stream read error");
                break;
            }
            Err(_) => {
                // Idle longer than the deadline with no partial frame buffered:
                // not an error (§4.1, §5).
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        handle_line(&coordinator, &dispatcher, &reconciler, &line, &peer_ip).await;
    }

    let evicted = coordinator.registry.drop_by_address(&peer_ip).await;
    if crate::sweeper::requeue_abandoned(&coordinator, evicted).await {
        dispatcher.on_queue_drain().await;
    }
}

async fn handle_line(
    coordinator: &Arc<Coordinator>,
    dispatcher: &Arc<Dispatcher>,
    reconciler: &Arc<Reconciler>,
    line: &str,
    peer_ip: &str,
) {
    let frame = match Frame::decode(line, peer_ip) {
        Ok(frame) => frame,
        Err(reason) => {
            debug!(peer = %peer_ip, %reason, "dropped malformed inbound frame");
            return;
        }
    };
    coordinator.network_log.push("in", peer_ip.to_owned(), frame.message_type()).await;

    match frame {
        Frame::QrScan { sender_id, qr_code, issue_type, coordinates, api_data } => {
            debug!(?qr_code, "qr scan received");
            let issue = Issue::new(issue_type, coordinates, sender_id, crate::frame::epoch_seconds(), api_data);
            dispatcher.on_issue(issue).await;
        }
        Frame::TaskCompleted { sender_id, task_id, issue_type, coordinates, status, message } => {
            if let Some(message) = &message {
                debug!(%message, "task completion message");
            }
            reconciler
                .on_task_completed(CompletionReport {
                    sender_id,
                    source_addr: peer_ip.to_owned(),
                    task_id,
                    issue_type,
                    coordinates,
                    status,
                })
                .await;
        }
        Frame::ForwardAll { receiver_category, content } => {
            forward_all(coordinator, &receiver_category, content).await;
        }
        Frame::ForwardTo { receiver_id, content } => {
            forward_to(coordinator, &receiver_id, content).await;
        }
        other => {
            debug!(message_type = other.message_type(), "frame type not valid on inbound stream, dropped");
        }
    }
}

/// `FORWARD_ALL` addresses by device *kind*, not id (original_source/
/// `backend/main.py::forward_to_all`).
async fn forward_all(coordinator: &Arc<Coordinator>, receiver_category: &str, content: serde_json::Value) {
    let kind = crate::device::DeviceKind::parse(receiver_category);
    let targets = coordinator.registry.all_of_kind(kind).await;
    let frame = crate::frame::forward_frame("FORWARD_ALL", content);
    for device in targets {
        let ok = send_line(&device.address, coordinator.config.tcp_out_port, &frame, coordinator.config.connect_timeout())
            .await
            .is_ok();
        coordinator.network_log.push("out", device.id.clone(), "FORWARD_ALL").await;
        if !ok {
            warn!(device_id = %device.id, "forward_all delivery failed");
        }
    }
}

/// `FORWARD_TO` addresses a single device by id; a successful send stamps
/// the device's display-only `forwarded` marker so an operator can see the
/// last broadcast reached it (original_source/ parity, not a `Task`).
async fn forward_to(coordinator: &Arc<Coordinator>, receiver_id: &str, content: serde_json::Value) {
    let device = match coordinator.registry.get(receiver_id).await {
        Some(device) => device,
        None => match coordinator.registry.find_by_address(receiver_id).await {
            Some(device) => device,
            None => {
                warn!(receiver_id, "forward_to target unknown");
                return;
            }
        },
    };
    let frame = crate::frame::forward_frame("FORWARD_TO", content);
    let ok = send_line(&device.address, coordinator.config.tcp_out_port, &frame, coordinator.config.connect_timeout())
        .await
        .is_ok();
    coordinator.network_log.push("out", device.id.clone(), "FORWARD_TO").await;
    if !ok {
        warn!(device_id = %device.id, "forward_to delivery failed");
    }
}

#[cfg(test)]
#[path = "tcp_in_tests.rs"]
mod tests;
