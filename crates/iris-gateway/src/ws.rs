// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `GET /ws/chat/{session_id}?token=…` (§6): upgrades to a duplex socket
//! subscribed to `chat-session-{session_id}`, bridged from a
//! [`iris_broadcast::Broadcaster`] subscription exactly the way
//! `sven-gateway::http::ws` bridges an `AgentHandle`'s `ControlEvent`
//! broadcast into a `WebSocket`.

use std::collections::HashMap;

use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::AppState;

const CLOSE_AUTH_FAILED: u16 = 1008;
const CLOSE_INTERNAL_ERROR: u16 = 1011;
const CLOSE_NORMAL: u16 = 1000;

pub async fn chat_socket(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(params): Query<HashMap<String, String>>,
    ws: WebSocketUpgrade,
) -> Response {
    let token = params.get("token").cloned();
    ws.on_upgrade(move |socket| handle_socket(state, session_id, token, socket))
}

async fn handle_socket(state: AppState, session_id: Uuid, token: Option<String>, mut socket: WebSocket) {
    let user_id = match token {
        Some(t) => crate::auth::authenticate_query_token(&state.auth, &t).await,
        None => None,
    };

    let Some(user_id) = user_id else {
        let _ = socket
            .send(WsMessage::Close(Some(CloseFrame {
                code: CLOSE_AUTH_FAILED,
                reason: "authentication failed".into(),
            })))
            .await;
        return;
    };

    match state.store.get_session(session_id).await {
        Ok(Some(session)) if session.user_id == user_id => {}
        Ok(Some(_)) => {
            let _ = socket
                .send(WsMessage::Close(Some(CloseFrame {
                    code: CLOSE_AUTH_FAILED,
                    reason: "not your session".into(),
                })))
                .await;
            return;
        }
        Ok(None) => {
            let _ = socket
                .send(WsMessage::Close(Some(CloseFrame {
                    code: CLOSE_AUTH_FAILED,
                    reason: "unknown session".into(),
                })))
                .await;
            return;
        }
        Err(err) => {
            warn!(error = %err, %session_id, "store lookup failed during ws handshake");
            let _ = socket
                .send(WsMessage::Close(Some(CloseFrame {
                    code: CLOSE_INTERNAL_ERROR,
                    reason: "internal error".into(),
                })))
                .await;
            return;
        }
    }

    let (sub_id, mut events) = state.broadcaster.subscribe(user_id.clone(), session_id).await;
    info!(%session_id, %user_id, "ws subscriber connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // This surface is output-only; any client frame is
                        // ignored rather than rejected, matching the
                        // teacher's read-drain-only bridge.
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, %session_id, "ws recv error");
                        break;
                    }
                }
            }
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let frame = event.to_wire_frame().to_string();
                        if socket.send(WsMessage::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%session_id, skipped, "ws subscriber lagged, dropped events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    state.broadcaster.unsubscribe(sub_id).await;
    let _ = socket
        .send(WsMessage::Close(Some(CloseFrame { code: CLOSE_NORMAL, reason: "closing".into() })))
        .await;
    info!(%session_id, %user_id, "ws subscriber disconnected");
}
