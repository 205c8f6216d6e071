// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The process-wide `RunningAgent` registry (§4.C).

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use iris_config::{AgentConfig, ModelConfig};
use iris_federation::TelegramCredentials;
use iris_store::{AgentRecord, Store};
use iris_tools::ToolCall;

use crate::error::{LifecycleError, LifecycleResult};
use crate::materialize::{build_endpoints, build_model_config, truncated_token};
use crate::running_agent::{self, Platform, RunningAgent};

const DEFAULT_AGENT_TEMPLATE: &str = include_str!("../assets/default_agent.json");
const DEFAULT_AGENT_OWNER: &str = "system";

/// Owns the registry of materialised agents and everything needed to
/// (re)materialise one: the Chat Session Store and the process-wide default
/// `ModelConfig` each agent's own settings can override.
pub struct LifecycleManager {
    store: Store,
    process_model: ModelConfig,
    registry: RwLock<HashMap<Uuid, Arc<RunningAgent>>>,
    materialize_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl LifecycleManager {
    pub fn new(store: Store, process_model: ModelConfig) -> Self {
        Self {
            store,
            process_model,
            registry: RwLock::new(HashMap::new()),
            materialize_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Loads every persisted agent and materialises what it can, logging and
    /// skipping the rest. Seeds and materialises a default agent if the
    /// store is empty.
    pub async fn startup(&self) -> LifecycleResult<()> {
        let mut configs = self.store.list_agents(None).await?;
        if configs.is_empty() {
            self.seed_default_agent().await?;
            configs = self.store.list_agents(None).await?;
        }

        for record in configs {
            let id = record.id;
            let name = record.config.name.clone();
            if let Err(err) = self.materialize_and_insert(record).await {
                warn!(agent_id = %id, name = %name, error = %err, "failed to materialise agent at startup, skipping");
            }
        }
        Ok(())
    }

    async fn seed_default_agent(&self) -> LifecycleResult<()> {
        let template: AgentConfig = serde_json::from_str(DEFAULT_AGENT_TEMPLATE)
            .expect("bundled default agent template is valid JSON");
        match self.store.create_agent(DEFAULT_AGENT_OWNER, template).await {
            Ok(_) => Ok(()),
            Err(iris_store::StoreError::Conflict(_)) => Ok(()),
            Err(other) => Err(other.into()),
        }
    }

    /// Persists `config` under `user_id`, then materialises it. Rejects a
    /// `name` collision as [`LifecycleError::NameConflict`].
    pub async fn create(&self, user_id: &str, config: AgentConfig) -> LifecycleResult<Arc<RunningAgent>> {
        let record = self.store.create_agent(user_id, config).await?;
        self.materialize_and_insert(record).await
    }

    /// Shuts down and removes the `RunningAgent` (if live), then
    /// cascade-deletes from the Store. Only the owning user may delete.
    pub async fn delete(&self, agent_id: Uuid, requesting_user: &str) -> LifecycleResult<()> {
        let record = self.store.get_agent(agent_id).await?.ok_or(LifecycleError::NotFound)?;
        if record.user_id != requesting_user {
            return Err(LifecycleError::Forbidden);
        }
        self.registry.write().await.remove(&agent_id);
        self.store.delete_agent(agent_id).await?;
        Ok(())
    }

    /// Returns the live `RunningAgent`, rematerialising on demand if the
    /// config exists but isn't currently in memory. Two concurrent misses
    /// for the same `agent_id` produce at most one materialisation.
    pub async fn get(&self, agent_id: Uuid) -> LifecycleResult<Arc<RunningAgent>> {
        if let Some(running) = self.registry.read().await.get(&agent_id) {
            return Ok(running.clone());
        }

        let lock = self.lock_for(agent_id).await;
        let _guard = lock.lock().await;

        if let Some(running) = self.registry.read().await.get(&agent_id) {
            return Ok(running.clone());
        }

        let record = self.store.get_agent(agent_id).await?.ok_or(LifecycleError::NotFound)?;
        self.materialize_and_insert(record).await
    }

    /// Scans the registry for the agent bound to `inbound_bot_id` on
    /// `platform` whose `ToolSet` can still send on it. Never matches the
    /// default seed agent. Deterministic (sorted by `agent_id`) so repeated
    /// calls against an unchanged registry return the same agent.
    pub async fn route_platform(&self, platform: Platform, inbound_bot_id: &str) -> Option<Arc<RunningAgent>> {
        let registry = self.registry.read().await;
        let mut matches: Vec<&Arc<RunningAgent>> = registry
            .values()
            .filter(|a| a.config.name != DEFAULT_AGENT_TEMPLATE_NAME)
            .filter(|a| a.serves_platform(platform))
            .filter(|a| a.bot_id_for(platform) == Some(inbound_bot_id))
            .collect();
        matches.sort_by_key(|a| a.id);
        matches.into_iter().next().cloned()
    }

    async fn lock_for(&self, agent_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.materialize_locks.lock().await;
        locks.entry(agent_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    async fn materialize_and_insert(&self, record: AgentRecord) -> LifecycleResult<Arc<RunningAgent>> {
        let running = Arc::new(self.materialize(record).await?);
        self.registry.write().await.insert(running.id, running.clone());
        Ok(running)
    }

    async fn materialize(&self, record: AgentRecord) -> LifecycleResult<RunningAgent> {
        let model_cfg = build_model_config(&record.config, &self.process_model);
        let model = iris_model::from_config(&model_cfg)
            .map_err(|e| LifecycleError::Materialization(e.to_string()))?;
        let system_prompt = iris_core::compose_system_prompt(&record.config);

        let endpoints = build_endpoints(&record.config);
        let outcome = iris_federation::discover(&endpoints).await;
        for failure in &outcome.failures {
            warn!(
                agent_id = %record.id,
                endpoint = %failure.endpoint_id,
                error = %failure.error,
                "tool server discovery failed, proceeding without it"
            );
        }
        let mut registry = outcome.registry;

        let secrets = record.config.settings.secrets.clone();
        let mut telegram_bot_id = None;
        if let (Some(bot_token), Some(api_id), Some(api_hash)) = (
            secrets.telegram_bot_token.clone(),
            secrets.telegram_api_id,
            secrets.telegram_api_hash.clone(),
        ) {
            info!(agent_id = %record.id, token = %truncated_token(&bot_token), "wiring telegram credentials");
            iris_federation::apply_telegram_credentials(
                &mut registry,
                TelegramCredentials { api_id, api_hash, bot_token },
            );
            telegram_bot_id = self.bootstrap_telegram_bot_id(&record.id, &registry).await;
        }

        let mut discord_bot_id = None;
        if let Some(bot_token) = secrets.discord_bot_token.clone() {
            info!(agent_id = %record.id, token = %truncated_token(&bot_token), "wiring discord credentials");
            match iris_federation::apply_discord_credentials(&mut registry, &bot_token).await {
                Ok(Some(id)) => discord_bot_id = Some(id),
                Ok(None) => {}
                Err(err) => warn!(agent_id = %record.id, error = %err, "failed to resolve discord bot id"),
            }
        }

        let has_discord_send = running_agent::has_send_tool(&registry, Platform::Discord);
        let has_telegram_send = running_agent::has_send_tool(&registry, Platform::Telegram);

        let agent = iris_core::Agent::new(Arc::from(model), Arc::new(registry), system_prompt);
        Ok(RunningAgent::new(
            record.id,
            record.config,
            agent,
            discord_bot_id,
            telegram_bot_id,
            has_discord_send,
            has_telegram_send,
        ))
    }

    async fn bootstrap_telegram_bot_id(
        &self,
        agent_id: &Uuid,
        registry: &iris_tools::ToolRegistry,
    ) -> Option<String> {
        let tool = registry.get("get_bot_id_telegram")?;
        let call = ToolCall {
            id: "lifecycle-bootstrap-get-bot-id-telegram".to_string(),
            name: "get_bot_id_telegram".to_string(),
            args: json!({}),
        };
        let output = tool.execute(&call).await;
        if output.is_error {
            warn!(agent_id = %agent_id, error = %output.content, "failed to resolve telegram bot id");
            return None;
        }
        let id = output.content.trim().trim_matches('"').to_string();
        (!id.is_empty()).then_some(id)
    }
}

const DEFAULT_AGENT_TEMPLATE_NAME: &str = "iris";
