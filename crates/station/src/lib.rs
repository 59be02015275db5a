// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! Coordination core for a base station supervising a fleet of drones and
//! ground agents: device registry and liveness, issue admission and dedup,
//! a learned agent-selection policy, dispatch, and completion reconciliation.

pub mod config;
pub mod device;
pub mod dispatcher;
pub mod error;
pub mod frame;
pub mod issue;
pub mod issue_store;
pub mod logs;
pub mod policy;
pub mod queue;
pub mod reconciler;
pub mod registry;
pub mod state;
pub mod sweeper;
pub mod task;
pub mod transport;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::StationConfig;
use crate::dispatcher::Dispatcher;
use crate::reconciler::Reconciler;
use crate::state::Coordinator;
use crate::transport::tcp_out::TcpCommandSink;
use crate::transport::{build_router, HttpState};

/// Run the base station until shutdown.
pub async fn run(config: StationConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let connect_timeout = config.connect_timeout();
    let udp_addr = config.udp_addr();
    let tcp_in_addr = config.tcp_in_addr();
    let http_addr = config.http_addr();

    let coordinator = Arc::new(Coordinator::new(config, shutdown.clone()));
    coordinator.policy.load().await;

    let tcp_out_port = coordinator.config.tcp_out_port;
    let sink = Arc::new(TcpCommandSink { connect_timeout, tcp_out_port });
    let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&coordinator), sink));
    let reconciler = Arc::new(Reconciler::new(Arc::clone(&coordinator), Arc::clone(&dispatcher)));

    sweeper::spawn(
        Arc::clone(&coordinator),
        Arc::clone(&dispatcher),
        coordinator.config.liveness_timeout(),
        coordinator.config.sweep_interval(),
    );

    // Bind both listeners synchronously so a port conflict fails `run()`
    // before any accept loop is backgrounded, matching the HTTP listener below.
    let udp_socket = transport::udp::bind(&udp_addr).await?;
    let tcp_in_listener = transport::tcp_in::bind(&tcp_in_addr).await?;

    {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            if let Err(err) = transport::udp::serve(coordinator, udp_socket).await {
                tracing::error!(%err, "discovery listener exited");
            }
        });
    }

    {
        let coordinator = Arc::clone(&coordinator);
        let dispatcher = Arc::clone(&dispatcher);
        let reconciler = Arc::clone(&reconciler);
        tokio::spawn(async move {
            if let Err(err) = transport::tcp_in::serve(coordinator, dispatcher, reconciler, tcp_in_listener).await {
                tracing::error!(%err, "inbound stream listener exited");
            }
        });
    }

    info!(addr = %http_addr, "status surface listening");
    let http_state = HttpState { coordinator: Arc::clone(&coordinator), dispatcher };
    let router = build_router(http_state);
    let listener = TcpListener::bind(&http_addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown.cancelled_owned()).await?;

    Ok(())
}
