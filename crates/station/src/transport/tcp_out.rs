// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! Outbound command dialer (§4.1, §5): one-shot TCP connection per command,
//! short connect timeout, no retry at this layer.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::device::Device;
use crate::dispatcher::CommandSink;
use crate::error::StationError;

/// Dials `addr:port`, writes `payload` as a single newline-terminated JSON
/// line, and closes. No retry; callers decide how to react to failure.
pub async fn send_line(
    addr: &str,
    port: u16,
    payload: &serde_json::Value,
    connect_timeout: Duration,
) -> Result<(), StationError> {
    let target = format!("{addr}:{port}");
    let mut stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&target))
        .await
        .map_err(|_| StationError::Internal)?
        .map_err(|_| StationError::Internal)?;

    let mut line = serde_json::to_vec(payload).map_err(|_| StationError::Internal)?;
    line.push(b'\n');
    stream.write_all(&line).await.map_err(|_| StationError::Internal)?;
    stream.shutdown().await.ok();
    debug!(target = %target, "delivered frame");
    Ok(())
}

/// The production `CommandSink`: dials the fixed outbound command port every
/// device listens on. `device.reply_tcp_port` is a distinct, ack-only value
/// (see `transport::udp::handle_connection_request`) and is never used here.
pub struct TcpCommandSink {
    pub connect_timeout: Duration,
    pub tcp_out_port: u16,
}

impl CommandSink for TcpCommandSink {
    fn send<'a>(
        &'a self,
        device: &'a Device,
        payload: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<(), StationError>> + Send + 'a>> {
        Box::pin(async move { send_line(&device.address, self.tcp_out_port, &payload, self.connect_timeout).await })
    }
}

#[cfg(test)]
#[path = "tcp_out_tests.rs"]
mod tests;
