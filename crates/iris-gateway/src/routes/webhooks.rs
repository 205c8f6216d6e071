// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Webhook HTTP surface (§6): Telegram and Discord inbound delivery.
//!
//! Data flow (§2.3): edge validates payload -> Lifecycle Manager selects
//! the agent bound to the inbound `bot_id` for that platform -> Runtime
//! produces a reply -> Tool Federation invokes the platform's
//! `send_message` tool with injected credentials. The reply is never
//! returned in the webhook's own HTTP response; platforms only care that
//! the acknowledgement came back quickly.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use iris_channels::{discord::DiscordReceiveMessage, telegram, InboundMessage};
use iris_lifecycle::{Platform, RunningAgent};
use iris_tools::ToolCall;

use crate::error::ApiError;
use crate::AppState;

pub async fn telegram_webhook(State(state): State<AppState>, Json(body): Json<Value>) -> impl IntoResponse {
    let Some(inbound) = telegram::parse_webhook(&body) else {
        return Json(json!({ "status": "ignored" }));
    };
    handle_inbound(&state, Platform::Telegram, inbound).await
}

pub async fn discord_receive_message(
    State(state): State<AppState>,
    Json(body): Json<DiscordReceiveMessage>,
) -> impl IntoResponse {
    let Some(inbound) = body.into_inbound() else {
        return Json(json!({ "status": "ignored" }));
    };
    handle_inbound(&state, Platform::Discord, inbound).await
}

async fn handle_inbound(state: &AppState, platform: Platform, inbound: InboundMessage) -> Json<Value> {
    let Some(running) = state.lifecycle.route_platform(platform, &inbound.bot_id).await else {
        return Json(json!({
            "status": "ignored",
            "detail": format!("No agent for bot ID {}.", inbound.bot_id),
        }));
    };

    if let Err(err) = run_and_reply(state, platform, &running, &inbound).await {
        warn!(error = %err, agent_id = %running.id, "webhook turn failed");
    }

    Json(json!({ "status": "ok" }))
}

async fn run_and_reply(
    state: &AppState,
    platform: Platform,
    running: &RunningAgent,
    inbound: &InboundMessage,
) -> Result<(), ApiError> {
    let user_id = running
        .config
        .user_id
        .clone()
        .unwrap_or_else(|| "platform".to_string());
    let session = platform_session(state, &user_id, running.id, platform, &inbound.chat_id).await?;

    let reply = crate::turn::drive(&state.store, &state.broadcaster, running, session.id, &inbound.text).await?;

    deliver_reply(running, platform, &inbound.chat_id, &reply).await;
    Ok(())
}

/// Finds or creates the one chat session standing in for a platform
/// conversation. There is no `(agent_id, external_chat_id)` column on
/// `chat_sessions` (§3 only models the API-facing session shape), so the
/// external chat id is folded into the session title, which is otherwise
/// free text the caller never relies on for identity.
async fn platform_session(
    state: &AppState,
    user_id: &str,
    agent_id: Uuid,
    platform: Platform,
    chat_id: &str,
) -> Result<iris_store::ChatSession, ApiError> {
    let title = platform_session_title(platform, chat_id);
    let existing = state.store.list_sessions(user_id, Some(agent_id), true, 100).await?;
    if let Some(session) = existing.into_iter().find(|s| s.title == title) {
        return Ok(session);
    }
    Ok(state.store.create_session(user_id, agent_id, &title).await?)
}

fn platform_session_title(platform: Platform, chat_id: &str) -> String {
    match platform {
        Platform::Telegram => format!("telegram:{chat_id}"),
        Platform::Discord => format!("discord:{chat_id}"),
    }
}

/// Invokes the agent's platform `send_message` tool directly — the model
/// never sees this call, since the reply has already been produced.
async fn deliver_reply(running: &RunningAgent, platform: Platform, chat_id: &str, text: &str) {
    let tool_name = platform.send_tool_name();
    let Some(tool) = running.agent.tools().get(tool_name) else {
        warn!(agent_id = %running.id, tool_name, "send tool missing at delivery time");
        return;
    };

    let call = ToolCall {
        id: Uuid::new_v4().to_string(),
        name: tool_name.to_string(),
        args: json!({ "chat_id": chat_id, "text": text }),
    };
    let output = tool.execute(&call).await;
    if output.is_error {
        warn!(agent_id = %running.id, tool_name, error = %output.content, "failed to deliver platform reply");
    }
}
