// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `POST /internal/broadcast` (§6): loopback-only entry point that lets a
//! process-local tool (a long-running Discord gateway client, an operator
//! script) publish a [`iris_broadcast::BroadcastEvent`] without going
//! through a chat turn. Never reachable from outside the host — checked
//! by connecting IP rather than bearer token, since the caller here is
//! this same machine's own tooling, not a tenant.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{ConnectInfo, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use iris_broadcast::BroadcastEvent;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct BroadcastRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

pub async fn broadcast(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<BroadcastRequest>,
) -> Result<(), ApiError> {
    if !is_loopback(addr.ip()) {
        return Err(ApiError::Forbidden);
    }

    let session_id: Uuid = body
        .payload
        .get("session_id")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| ApiError::Validation("payload.session_id is mandatory".into()))?;

    let event = match body.kind.as_str() {
        "message_created" => BroadcastEvent::message_created(session_id, body.payload),
        "session_updated" => BroadcastEvent::session_updated(session_id, body.payload),
        "llm_stream_chunk" => {
            let delta = body.payload.get("delta").and_then(Value::as_str).unwrap_or_default();
            BroadcastEvent::llm_stream_chunk(session_id, delta)
        }
        "error" => {
            let message = body.payload.get("message").and_then(Value::as_str).unwrap_or_default();
            BroadcastEvent::error(session_id, message)
        }
        other => return Err(ApiError::Validation(format!("unknown broadcast type {other:?}"))),
    };

    state.broadcaster.broadcast(event).await;
    Ok(())
}

fn is_loopback(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4 == Ipv4Addr::LOCALHOST,
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}
