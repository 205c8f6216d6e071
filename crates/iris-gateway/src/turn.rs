// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The one place a chat turn is driven end to end: pulls history from the
//! Chat Session Store, runs it through the Agent Runtime's `call_model ->
//! call_tool -> done` loop, and persists + broadcasts every message that
//! loop produces. `routes::agents::chat` and `routes::sessions::post_message`
//! both call this — they differ only in how they got a `session_id` and a
//! `RunningAgent`.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};
use uuid::Uuid;

use iris_broadcast::{BroadcastEvent, Broadcaster};
use iris_core::RuntimeEvent;
use iris_lifecycle::{store_messages_to_model, tool_result_to_store_content, RunningAgent};
use iris_model::Message;
use iris_store::{MessageContent, Role, Store, ToolCallRecord};

use crate::error::ApiError;

const MODEL_ERROR_REPLY: &str = "An error occurred while generating the response.";

/// Runs one turn for `user_text` against `session_id` and returns the
/// agent's final reply text. Every intermediate message (the user's own,
/// any tool invocations/results, and the final reply) is persisted to
/// `store` and broadcast via `broadcaster` as it happens; only the final
/// reply is returned to the HTTP caller.
pub async fn drive(
    store: &Store,
    broadcaster: &Arc<Broadcaster>,
    agent: &RunningAgent,
    session_id: Uuid,
    user_text: &str,
) -> Result<String, ApiError> {
    if user_text.trim().is_empty() {
        return Err(ApiError::Validation("message must not be empty".into()));
    }

    let history_rows = store.get_messages(session_id).await?;
    let history = store_messages_to_model(&history_rows);

    persist_and_broadcast(store, broadcaster, session_id, Role::User, MessageContent::text(user_text), false)
        .await?;

    let (tx, rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();

    let forward_store = store.clone();
    let forward_broadcaster = broadcaster.clone();
    let forward = tokio::spawn(async move {
        forward_events(&forward_store, &forward_broadcaster, session_id, rx).await;
    });

    let outcome = agent.agent.run_turn(&history, Message::user(user_text), tx, cancel).await;
    let _ = forward.await;

    match outcome {
        Ok(iris_core::TurnOutcome::Final(text)) => {
            persist_and_broadcast(store, broadcaster, session_id, Role::Agent, MessageContent::text(&text), false)
                .await?;
            Ok(text)
        }
        Ok(iris_core::TurnOutcome::Cancelled) => Err(ApiError::Cancelled),
        Err(err) => {
            error!(error = %err, %session_id, "turn failed");
            persist_and_broadcast(
                store,
                broadcaster,
                session_id,
                Role::Agent,
                MessageContent::text(MODEL_ERROR_REPLY),
                false,
            )
            .await?;
            broadcaster.broadcast(BroadcastEvent::error(session_id, err.to_string())).await;
            Err(ApiError::ModelError(err.to_string()))
        }
    }
}

async fn forward_events(
    store: &Store,
    broadcaster: &Broadcaster,
    session_id: Uuid,
    mut rx: mpsc::Receiver<RuntimeEvent>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            RuntimeEvent::TextDelta(delta) => {
                // §4.B step 1: every fragment is persisted as a partial
                // `agent` message before (step 2) being broadcast as a
                // stream chunk — not folded into `persist_and_broadcast`,
                // since a partial fragment is never itself a
                // `message_created` event.
                if let Err(err) =
                    store.add_message(session_id, Role::Agent, MessageContent::text(delta.clone()), true).await
                {
                    warn!(error = %err, %session_id, "failed to persist agent partial");
                }
                broadcaster.broadcast(BroadcastEvent::llm_stream_chunk(session_id, delta)).await;
            }
            RuntimeEvent::ToolCallStarted(call) => {
                let content = MessageContent::ToolInvocation {
                    calls: vec![ToolCallRecord { id: call.id, name: call.name, args: call.args }],
                };
                if let Err(err) =
                    persist_and_broadcast(store, broadcaster, session_id, Role::Agent, content, true).await
                {
                    warn!(error = %err, %session_id, "failed to persist tool invocation");
                }
            }
            RuntimeEvent::ToolCallFinished { call_id, tool_name: _, output, is_error: _ } => {
                let content = tool_result_to_store_content(&call_id, &output);
                if let Err(err) =
                    persist_and_broadcast(store, broadcaster, session_id, Role::Tool, content, false).await
                {
                    warn!(error = %err, %session_id, "failed to persist tool result");
                }
            }
            RuntimeEvent::Error(message) => {
                broadcaster.broadcast(BroadcastEvent::error(session_id, message)).await;
            }
        }
    }
}

async fn persist_and_broadcast(
    store: &Store,
    broadcaster: &Broadcaster,
    session_id: Uuid,
    role: Role,
    content: MessageContent,
    is_partial: bool,
) -> Result<Uuid, ApiError> {
    let id = store.add_message(session_id, role, content.clone(), is_partial).await?;
    let value = message_json(id, session_id, role, &content, is_partial);
    broadcaster.broadcast(BroadcastEvent::message_created(session_id, value)).await;
    Ok(id)
}

fn message_json(id: Uuid, session_id: Uuid, role: Role, content: &MessageContent, is_partial: bool) -> Value {
    json!({
        "id": id,
        "session_id": session_id,
        "role": role,
        "content": content,
        "is_partial": is_partial,
        "timestamp": Utc::now(),
    })
}
