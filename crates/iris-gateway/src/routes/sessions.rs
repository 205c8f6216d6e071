// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Chat session HTTP surface (§6): CRUD over [`iris_store::ChatSession`]
//! plus the message endpoints, one of which drives a turn.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use iris_store::ChatSession;

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::AppState;

/// Fetches a session and checks `user_id` owns it, folding "not found" and
/// "not yours" into the same 404 so a caller can't enumerate other
/// tenants' session ids by timing the distinction.
async fn owned_session(state: &AppState, id: Uuid, user_id: &str) -> Result<ChatSession, ApiError> {
    let session = state.store.get_session(id).await?.ok_or(ApiError::NotFound)?;
    if session.user_id != user_id {
        return Err(ApiError::NotFound);
    }
    Ok(session)
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub agent_id: Uuid,
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_title() -> String {
    "New chat".to_string()
}

pub async fn create(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Json(body): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Ensures the agent exists (and is materialisable) before a session is
    // created against it — a session pointing at an unknown agent can never
    // host a turn.
    state.lifecycle.get(body.agent_id).await?;

    let session = state.store.create_session(&user_id, body.agent_id, &body.title).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub agent_id: Option<Uuid>,
    #[serde(default)]
    pub active_only: bool,
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Query(query): Query<ListSessionsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state
        .store
        .list_sessions(&user_id, query.agent_id, query.active_only, query.limit.unwrap_or(50))
        .await?;
    Ok(Json(sessions))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(owned_session(&state, id, &user_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateSessionRequest {
    pub title: Option<String>,
    pub is_active: Option<bool>,
}

pub async fn update(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateSessionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    owned_session(&state, id, &user_id).await?;
    let session = state.store.update_session(id, body.title, body.is_active).await?;
    Ok(Json(session))
}

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    owned_session(&state, id, &user_id).await?;
    Ok(Json(state.store.get_messages(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    #[serde(default = "default_role")]
    pub role: String,
    pub content: String,
}

fn default_role() -> String {
    "user".to_string()
}

/// Posts a message and, when `role` is `"user"` (the only role a caller may
/// submit through this route), drives a turn for it. The response mirrors
/// `POST /agents/{id}/chat`'s shape so either surface can back the same
/// client code.
pub async fn post_message(
    State(state): State<AppState>,
    Extension(AuthenticatedUser(user_id)): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(body): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.role != "user" {
        return Err(ApiError::Validation("only user messages can be posted here".into()));
    }

    let session = owned_session(&state, id, &user_id).await?;
    let running = state.lifecycle.get(session.agent_id).await?;

    let response = crate::turn::drive(&state.store, &state.broadcaster, &running, id, &body.content).await?;

    Ok(Json(serde_json::json!({ "response": response })))
}
