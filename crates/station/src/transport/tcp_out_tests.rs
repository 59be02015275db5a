// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;

use super::*;

#[tokio::test]
async fn send_line_writes_a_single_newline_terminated_frame() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.expect("read");
        buf
    });

    let payload = serde_json::json!({"message_type": "MOVEMENT_COMMAND"});
    send_line(&addr.ip().to_string(), addr.port(), &payload, Duration::from_secs(2))
        .await
        .expect("send");

    let received = server.await.expect("join");
    let text = String::from_utf8(received).expect("utf8");
    assert!(text.ends_with('\n'));
    let parsed: serde_json::Value = serde_json::from_str(text.trim_end()).expect("json");
    assert_eq!(parsed["message_type"], "MOVEMENT_COMMAND");
}

#[tokio::test]
async fn send_line_fails_fast_on_connect_timeout() {
    // 10.255.255.1 is a non-routable address commonly used to exercise connect timeouts.
    let payload = serde_json::json!({});
    let result =
        send_line("10.255.255.1", 1, &payload, Duration::from_millis(50)).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn tcp_command_sink_dials_the_fixed_out_port_not_the_device_reply_port() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let out_port = listener.local_addr().expect("addr").port();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.expect("read");
        buf
    });

    let device = crate::device::Device {
        id: "agent-1".into(),
        kind: crate::device::DeviceKind::Agent,
        address: "127.0.0.1".into(),
        // deliberately wrong/unreachable: the sink must never dial this.
        reply_tcp_port: 1,
        position: crate::frame::Position { x: 0.0, y: 0.0, z: 0.0 },
        battery: 100.0,
        status: crate::device::DeviceStatus::Connected,
        last_seen: std::time::Instant::now(),
        assignment: None,
    };
    let sink = TcpCommandSink { connect_timeout: Duration::from_secs(2), tcp_out_port: out_port };

    sink.send(&device, serde_json::json!({"message_type": "MOVEMENT_COMMAND"})).await.expect("send");

    let received = server.await.expect("join");
    assert!(!received.is_empty());
}
