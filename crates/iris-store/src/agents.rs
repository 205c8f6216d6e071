// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use chrono::Utc;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::AgentRecord;
use crate::store::Store;

#[derive(FromRow)]
struct AgentRow {
    id: Uuid,
    user_id: String,
    config: Json<iris_config::AgentConfig>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl From<AgentRow> for AgentRecord {
    fn from(row: AgentRow) -> Self {
        let mut config = row.config.0;
        config.id = Some(row.id.to_string());
        config.user_id = Some(row.user_id.clone());
        AgentRecord {
            id: row.id,
            user_id: row.user_id,
            config,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl Store {
    /// Persists a new agent. Rejects a `name` collision with
    /// [`StoreError::Conflict`] (enforced by the `agents.name` UNIQUE
    /// constraint — see `migrations/0001_init.sql`).
    pub async fn create_agent(
        &self,
        user_id: &str,
        config: iris_config::AgentConfig,
    ) -> StoreResult<AgentRecord> {
        let row: AgentRow = sqlx::query_as(
            r#"
            INSERT INTO agents (user_id, name, config)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, config, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&config.name)
        .bind(Json(&config))
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            StoreError::from_sqlx(e, &format!("an agent named {:?} already exists", config.name))
        })?;

        Ok(row.into())
    }

    pub async fn get_agent(&self, id: Uuid) -> StoreResult<Option<AgentRecord>> {
        let row: Option<AgentRow> = sqlx::query_as(
            "SELECT id, user_id, config, created_at, updated_at FROM agents WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(Into::into))
    }

    /// Lists agents visible to `user_id`. `user_id = None` lists every agent
    /// (used by the Lifecycle Manager's startup scan).
    pub async fn list_agents(&self, user_id: Option<&str>) -> StoreResult<Vec<AgentRecord>> {
        let rows: Vec<AgentRow> = match user_id {
            Some(uid) => {
                sqlx::query_as(
                    "SELECT id, user_id, config, created_at, updated_at FROM agents \
                     WHERE user_id = $1 ORDER BY created_at",
                )
                .bind(uid)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, user_id, config, created_at, updated_at FROM agents ORDER BY created_at",
                )
                .fetch_all(self.pool())
                .await?
            }
        };

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Deletes an agent. Tool bindings and chat sessions cascade via foreign
    /// key constraints.
    pub async fn delete_agent(&self, id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM agents WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Bumps `last_used` to now and increments `total_sessions`. Called
    /// atomically alongside session creation.
    pub(crate) async fn bump_agent_usage_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        agent_id: Uuid,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE agents SET last_used = now(), total_sessions = total_sessions + 1, \
             updated_at = now() WHERE id = $1",
        )
        .bind(agent_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
