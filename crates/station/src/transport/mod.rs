// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 the station contributors

//! Transport layer: the two device-facing listeners (§4.1) plus the
//! read-only HTTP status surface (§4.8, §6).

pub mod http;
pub mod tcp_in;
pub mod tcp_out;
pub mod udp;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::dispatcher::Dispatcher;
use crate::state::Coordinator;

/// Shared state for the HTTP status surface.
#[derive(Clone)]
pub struct HttpState {
    pub coordinator: Arc<Coordinator>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Build the router for the read-only status surface (§4.8). Additive
/// ambient infrastructure, not part of the device-facing wire protocol.
pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/health", get(http::health))
        .route("/api/roster", get(http::roster))
        .route("/api/overview", get(http::overview))
        .route("/api/issues", get(http::open_issues))
        .route("/api/network-logs", get(http::recent_frames))
        .route("/api/network-logs/clear", post(http::clear_frames))
        .route("/api/commands", get(http::recent_commands))
        .route("/api/synthesize/{kind}", post(http::synthesize_issue))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
