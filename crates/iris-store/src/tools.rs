// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The global `Tool` catalogue (§3: `Tool { id, name (unique), description,
//! config }`). An `AgentConfig`'s own `tools: Vec<AgentToolBinding>` embeds
//! a denormalised copy of the tool it references (`tool_details`) so reads
//! never need a join; this catalogue exists for the id/name-uniqueness
//! contract `AgentToolBinding::tool_id` points at.

use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::models::ToolRecord;
use crate::store::Store;

#[derive(FromRow)]
struct ToolRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    config: serde_json::Value,
}

impl From<ToolRow> for ToolRecord {
    fn from(r: ToolRow) -> Self {
        ToolRecord {
            id: r.id,
            name: r.name,
            description: r.description,
            config: r.config,
        }
    }
}

impl Store {
    pub async fn create_tool(
        &self,
        name: &str,
        description: Option<&str>,
        config: serde_json::Value,
    ) -> StoreResult<ToolRecord> {
        let row: ToolRow = sqlx::query_as(
            "INSERT INTO tools (name, description, config) VALUES ($1, $2, $3) \
             RETURNING id, name, description, config",
        )
        .bind(name)
        .bind(description)
        .bind(config)
        .fetch_one(self.pool())
        .await
        .map_err(|e| StoreError::from_sqlx(e, &format!("a tool named {name:?} already exists")))?;

        Ok(row.into())
    }

    pub async fn get_tool_by_name(&self, name: &str) -> StoreResult<Option<ToolRecord>> {
        let row: Option<ToolRow> =
            sqlx::query_as("SELECT id, name, description, config FROM tools WHERE name = $1")
                .bind(name)
                .fetch_optional(self.pool())
                .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list_tools(&self) -> StoreResult<Vec<ToolRecord>> {
        let rows: Vec<ToolRow> =
            sqlx::query_as("SELECT id, name, description, config FROM tools ORDER BY name")
                .fetch_all(self.pool())
                .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Binds `tool_id` to `agent_id`. `ON CONFLICT DO UPDATE` makes this
    /// idempotent for re-saving an agent's tool selection.
    pub async fn set_agent_tool_binding(
        &self,
        agent_id: Uuid,
        tool_id: Uuid,
        is_enabled: bool,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO agent_tool_association (agent_id, tool_id, is_enabled)
            VALUES ($1, $2, $3)
            ON CONFLICT (agent_id, tool_id) DO UPDATE SET is_enabled = EXCLUDED.is_enabled
            "#,
        )
        .bind(agent_id)
        .bind(tool_id)
        .bind(is_enabled)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
