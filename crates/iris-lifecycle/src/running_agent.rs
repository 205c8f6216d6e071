// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! In-memory materialisation of one [`iris_config::AgentConfig`] (§2.3).

use std::sync::Arc;

use uuid::Uuid;

/// Platform a webhook or bot-id lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Discord,
    Telegram,
}

impl Platform {
    pub fn send_tool_name(self) -> &'static str {
        match self {
            Platform::Discord => "send_message",
            Platform::Telegram => "send_message_telegram",
        }
    }
}

/// One agent's live runtime: its [`iris_core::Agent`], resolved platform bot
/// ids, and the persona config it was built from.
///
/// Holds no handle to close its federated tool server connections
/// explicitly — `iris_mcp_client::RemoteToolServer::close` is async and a
/// `RunningAgent` has no async `Drop`, so shutdown relies on dropping the
/// last `Arc` reference to this value, which tears down the underlying
/// transport the same way any other client connection would when abandoned.
pub struct RunningAgent {
    pub id: Uuid,
    pub config: iris_config::AgentConfig,
    pub agent: Arc<iris_core::Agent>,
    pub discord_bot_id: Option<String>,
    pub telegram_bot_id: Option<String>,
    has_discord_send: bool,
    has_telegram_send: bool,
}

impl RunningAgent {
    pub fn new(
        id: Uuid,
        config: iris_config::AgentConfig,
        agent: iris_core::Agent,
        discord_bot_id: Option<String>,
        telegram_bot_id: Option<String>,
        has_discord_send: bool,
        has_telegram_send: bool,
    ) -> Self {
        Self {
            id,
            config,
            agent: Arc::new(agent),
            discord_bot_id,
            telegram_bot_id,
            has_discord_send,
            has_telegram_send,
        }
    }

    /// Whether this agent's `ToolSet` contains `platform`'s send tool —
    /// required by `route_platform` (§4.C) before matching on a bot id.
    pub fn serves_platform(&self, platform: Platform) -> bool {
        match platform {
            Platform::Discord => self.has_discord_send,
            Platform::Telegram => self.has_telegram_send,
        }
    }

    pub fn bot_id_for(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Discord => self.discord_bot_id.as_deref(),
            Platform::Telegram => self.telegram_bot_id.as_deref(),
        }
    }
}

pub(crate) fn has_send_tool(registry: &iris_tools::ToolRegistry, platform: Platform) -> bool {
    registry.contains(platform.send_tool_name())
}
