// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Agent management HTTP surface (§6): create/list/get/delete an
//! [`iris_config::AgentConfig`], plus the one-shot `POST /agents/{id}/chat`
//! that drives a turn without a caller-managed session.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use iris_config::AgentConfig;
use iris_store::AgentRecord;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::AppState;

/// `AgentConfig` with `settings.secrets` blanked out — never echoed back to
/// a caller once stored (`iris-config::schema::AgentSecrets` doc comment).
fn redact(mut record: AgentRecord) -> Value {
    record.config.settings.secrets = Default::default();
    json!({
        "id": record.id,
        "user_id": record.user_id,
        "config": record.config,
        "created_at": record.created_at,
        "updated_at": record.updated_at,
    })
}

pub async fn create(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(config): Json<AgentConfig>,
) -> Result<impl IntoResponse, ApiError> {
    if config.name.trim().is_empty() {
        return Err(ApiError::Validation("agent name must not be empty".into()));
    }

    let running = state.lifecycle.create(&user_id, config).await?;
    let record = state
        .store
        .get_agent(running.id)
        .await?
        .ok_or(ApiError::NotFound)?;

    Ok((StatusCode::CREATED, Json(redact(record))))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, ApiError> {
    let records = state.store.list_agents(Some(&user_id)).await?;
    Ok(Json(records.into_iter().map(redact).collect::<Vec<_>>()))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let record = state.store.get_agent(id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(redact(record)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.lifecycle.delete(id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Drives one turn against the caller's own ongoing session with this
/// agent, creating it on first contact. Unlike the `/chat/sessions/*`
/// surface, the caller never has to know a `session_id` exists.
pub async fn chat(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(agent_id): Path<Uuid>,
    Json(body): Json<ChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.message.trim().is_empty() {
        return Err(ApiError::Validation("message must not be empty".into()));
    }

    let running = state.lifecycle.get(agent_id).await?;

    let existing = state.store.list_sessions(&user_id, Some(agent_id), true, 1).await?;
    let session = match existing.into_iter().next() {
        Some(session) => session,
        None => {
            let title = format!("Chat with {}", running.config.name);
            state.store.create_session(&user_id, agent_id, &title).await?
        }
    };

    let response = crate::turn::drive(&state.store, &state.broadcaster, &running, session.id, &body.message).await?;

    Ok(Json(json!({ "response": response })))
}
