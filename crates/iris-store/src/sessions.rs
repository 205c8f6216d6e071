// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use chrono::Utc;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::{ChatMessage, ChatSession, ChatSummary, MessageContent, Role};
use crate::rowconv::{role_to_message_type, role_to_sender_type, sender_type_to_role};
use crate::store::Store;

/// Every `SUMMARY_STRIDE`th non-partial message triggers a summary
/// regeneration (§4.D, §8 boundary behaviour).
pub const SUMMARY_STRIDE: i64 = 10;

#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: String,
    agent_id: Uuid,
    title: String,
    is_active: bool,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl From<SessionRow> for ChatSession {
    fn from(r: SessionRow) -> Self {
        ChatSession {
            id: r.id,
            user_id: r.user_id,
            agent_id: r.agent_id,
            title: r.title,
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRow {
    id: Uuid,
    session_id: Uuid,
    sender_type: String,
    content: Json<MessageContent>,
    is_partial: bool,
    created_at: chrono::DateTime<Utc>,
}

impl Store {
    /// Atomically inserts a session and bumps the owning agent's
    /// `total_sessions`/`last_used`.
    pub async fn create_session(
        &self,
        user_id: &str,
        agent_id: Uuid,
        title: &str,
    ) -> StoreResult<ChatSession> {
        let mut tx = self.pool().begin().await?;

        let row: SessionRow = sqlx::query_as(
            r#"
            INSERT INTO chat_sessions (user_id, agent_id, title)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, agent_id, title, is_active, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(agent_id)
        .bind(title)
        .fetch_one(&mut *tx)
        .await?;

        Store::bump_agent_usage_tx(&mut tx, agent_id).await?;

        tx.commit().await?;
        Ok(row.into())
    }

    pub async fn get_session(&self, id: Uuid) -> StoreResult<Option<ChatSession>> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, user_id, agent_id, title, is_active, created_at, updated_at \
             FROM chat_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Into::into))
    }

    /// Lists sessions for `user_id`, optionally narrowed to one `agent_id`
    /// and/or active-only, sorted by `updated_at` descending.
    pub async fn list_sessions(
        &self,
        user_id: &str,
        agent_id: Option<Uuid>,
        active_only: bool,
        limit: i64,
    ) -> StoreResult<Vec<ChatSession>> {
        let rows: Vec<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, agent_id, title, is_active, created_at, updated_at
            FROM chat_sessions
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR agent_id = $2)
              AND ($3 = false OR is_active = true)
            ORDER BY updated_at DESC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(agent_id)
        .bind(active_only)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update_session(
        &self,
        id: Uuid,
        title: Option<String>,
        is_active: Option<bool>,
    ) -> StoreResult<ChatSession> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            UPDATE chat_sessions
            SET title = COALESCE($2, title),
                is_active = COALESCE($3, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING id, user_id, agent_id, title, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(is_active)
        .fetch_optional(self.pool())
        .await?;

        row.map(Into::into).ok_or(StoreError::NotFound)
    }

    /// Inserts a message, bumps the session's `updated_at`, and — when
    /// `is_partial` is false and the non-partial count has just become a
    /// multiple of [`SUMMARY_STRIDE`] — regenerates the session's summary.
    pub async fn add_message(
        &self,
        session_id: Uuid,
        role: Role,
        content: MessageContent,
        is_partial: bool,
    ) -> StoreResult<Uuid> {
        let mut tx = self.pool().begin().await?;

        let sender_type = role_to_sender_type(role);
        let message_type = role_to_message_type(role);

        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO chat_messages (session_id, sender_type, message_type, content, is_partial)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(session_id)
        .bind(sender_type)
        .bind(message_type)
        .bind(Json(&content))
        .bind(is_partial)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE chat_sessions SET updated_at = now() WHERE id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        if !is_partial {
            let (count,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM chat_messages WHERE session_id = $1 AND is_partial = false",
            )
            .bind(session_id)
            .fetch_one(&mut *tx)
            .await?;

            if count % SUMMARY_STRIDE == 0 {
                regenerate_summary(&mut tx, session_id, count).await?;
            }
        }

        tx.commit().await?;
        Ok(id)
    }

    /// Chronologically ascending; partials and finals both present.
    pub async fn get_messages(&self, session_id: Uuid) -> StoreResult<Vec<ChatMessage>> {
        let rows: Vec<MessageRow> = sqlx::query_as(
            "SELECT id, session_id, sender_type, content, is_partial, created_at \
             FROM chat_messages WHERE session_id = $1 ORDER BY created_at ASC",
        )
        .bind(session_id)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|r| {
                let role = sender_type_to_role(&r.sender_type).ok_or_else(|| {
                    StoreError::Database(sqlx::Error::Decode(
                        format!("unrecognised sender_type {:?}", r.sender_type).into(),
                    ))
                })?;
                Ok(ChatMessage {
                    id: r.id,
                    session_id: r.session_id,
                    role,
                    content: r.content.0,
                    timestamp: r.created_at,
                    is_partial: r.is_partial,
                })
            })
            .collect()
    }

    pub async fn get_summary(&self, session_id: Uuid) -> StoreResult<Option<ChatSummary>> {
        let row: Option<(Uuid, String, i64, chrono::DateTime<Utc>, chrono::DateTime<Utc>)> =
            sqlx::query_as(
                "SELECT session_id, text, message_count, created_at, updated_at \
                 FROM chat_summaries WHERE session_id = $1",
            )
            .bind(session_id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row.map(|(session_id, text, message_count, created_at, updated_at)| ChatSummary {
            session_id,
            text,
            message_count,
            created_at,
            updated_at,
        }))
    }
}

/// Builds a lightweight summary from the session's recent non-partial
/// messages and upserts it. The summary text itself is deliberately plain —
/// condensing conversation history into prose is an Agent Runtime /
/// model-assisted concern, not the Store's; this keeps the invariant
/// (`message_count` tracks the non-partial count at write time) satisfied
/// without the Store reaching back out to a `ModelProvider`.
async fn regenerate_summary(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    session_id: Uuid,
    message_count: i64,
) -> StoreResult<()> {
    let recent: Vec<(Json<MessageContent>,)> = sqlx::query_as(
        "SELECT content FROM chat_messages \
         WHERE session_id = $1 AND is_partial = false \
         ORDER BY created_at DESC LIMIT $2",
    )
    .bind(session_id)
    .bind(SUMMARY_STRIDE)
    .fetch_all(&mut **tx)
    .await?;

    let snippets: Vec<String> = recent
        .into_iter()
        .rev()
        .map(|(c,)| truncate_snippet(&c.0.as_text()))
        .collect();
    let text = format!(
        "{message_count} messages exchanged. Most recent: {}",
        snippets.join(" | ")
    );

    sqlx::query(
        r#"
        INSERT INTO chat_summaries (session_id, text, message_count, updated_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (session_id) DO UPDATE
        SET text = EXCLUDED.text, message_count = EXCLUDED.message_count, updated_at = now()
        "#,
    )
    .bind(session_id)
    .bind(&text)
    .bind(message_count)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

fn truncate_snippet(s: &str) -> String {
    const MAX: usize = 80;
    if s.chars().count() <= MAX {
        s.to_string()
    } else {
        s.chars().take(MAX).collect::<String>() + "…"
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
