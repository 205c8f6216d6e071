// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Applies platform credential wrapping to a freshly discovered registry.
//!
//! Kept separate from [`crate::discovery`] because it runs after discovery
//! completes, and separate from the Lifecycle Manager because the
//! wrapping rules themselves (which tools, which params) belong with the
//! rest of the federation layer.

use iris_tools::{ToolCall, ToolRegistry};

use crate::wrappers::{
    DiscordToolWrapper, TelegramCredentials, TelegramToolWrapper, DISCORD_REGISTER_BOT_TOOL,
    DISCORD_WRAPPED_TOOLS, TELEGRAM_WRAPPED_TOOLS,
};

/// Re-registers every tool in `TELEGRAM_WRAPPED_TOOLS` present in `registry`
/// with a [`TelegramToolWrapper`] bound to `creds`. Returns the number of
/// tools wrapped; a tool server missing one of the names is not an error —
/// not every deployment exposes all three.
pub fn apply_telegram_credentials(registry: &mut ToolRegistry, creds: TelegramCredentials) -> usize {
    let mut wrapped = 0;
    for name in TELEGRAM_WRAPPED_TOOLS {
        if let Some(inner) = registry.get(name) {
            registry.register(TelegramToolWrapper::new(inner, creds.clone()));
            wrapped += 1;
        }
    }
    wrapped
}

/// Calls the unwrapped `register_discord_bot` tool with `bot_token` to mint
/// a bot id, then wraps every tool in `DISCORD_WRAPPED_TOOLS` with a
/// [`DiscordToolWrapper`] bound to it. Returns the resolved bot id so the
/// caller (the Lifecycle Manager) can record it on the `RunningAgent` for
/// incoming-webhook routing.
///
/// Returns `Ok(None)` if the server doesn't expose `register_discord_bot` —
/// the deployment simply doesn't support Discord and the caller should skip
/// Discord wiring for this agent rather than fail its whole startup.
pub async fn apply_discord_credentials(
    registry: &mut ToolRegistry,
    bot_token: &str,
) -> anyhow::Result<Option<String>> {
    let Some(register_tool) = registry.get(DISCORD_REGISTER_BOT_TOOL) else {
        return Ok(None);
    };

    let call = ToolCall {
        id: "federation-bootstrap-register-discord-bot".to_string(),
        name: DISCORD_REGISTER_BOT_TOOL.to_string(),
        args: serde_json::json!({ "bot_token": bot_token }),
    };
    let output = register_tool.execute(&call).await;
    if output.is_error {
        anyhow::bail!("register_discord_bot failed: {}", output.content);
    }
    let bot_id = output.content.trim().trim_matches('"').to_string();
    if bot_id.is_empty() {
        anyhow::bail!("register_discord_bot returned an empty bot id");
    }

    for name in DISCORD_WRAPPED_TOOLS {
        if let Some(inner) = registry.get(name) {
            registry.register(DiscordToolWrapper::new(inner, bot_id.clone()));
        }
    }

    Ok(Some(bot_id))
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use iris_tools::{Tool, ToolOutput};
    use serde_json::{json, Value};

    use super::*;

    struct StubTool {
        name: &'static str,
        reply: String,
        fail: bool,
    }

    #[async_trait]
    impl Tool for StubTool {
        fn name(&self) -> &str {
            self.name
        }
        fn description(&self) -> &str {
            "stub"
        }
        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }
        async fn execute(&self, call: &iris_tools::ToolCall) -> ToolOutput {
            if self.fail {
                ToolOutput::err(&call.id, "nope")
            } else {
                ToolOutput::ok(&call.id, self.reply.clone())
            }
        }
    }

    fn telegram_creds() -> TelegramCredentials {
        TelegramCredentials {
            api_id: 1,
            api_hash: "h".into(),
            bot_token: "t".into(),
        }
    }

    #[test]
    fn apply_telegram_credentials_wraps_present_tools_only() {
        let mut registry = ToolRegistry::new();
        registry.register(StubTool {
            name: "send_message_telegram",
            reply: "ok".into(),
            fail: false,
        });
        let wrapped = apply_telegram_credentials(&mut registry, telegram_creds());
        assert_eq!(wrapped, 1);
        assert!(registry.contains("send_message_telegram"));
    }

    #[tokio::test]
    async fn apply_discord_credentials_resolves_bot_id_and_wraps() {
        let mut registry = ToolRegistry::new();
        registry.register(StubTool {
            name: DISCORD_REGISTER_BOT_TOOL,
            reply: "bot-7".into(),
            fail: false,
        });
        registry.register(StubTool {
            name: "send_message",
            reply: "sent".into(),
            fail: false,
        });

        let bot_id = apply_discord_credentials(&mut registry, "tok")
            .await
            .unwrap();
        assert_eq!(bot_id, Some("bot-7".to_string()));
        assert!(registry.contains("send_message"));
    }

    #[tokio::test]
    async fn apply_discord_credentials_missing_tool_returns_none() {
        let mut registry = ToolRegistry::new();
        let bot_id = apply_discord_credentials(&mut registry, "tok")
            .await
            .unwrap();
        assert_eq!(bot_id, None);
    }

    #[tokio::test]
    async fn apply_discord_credentials_propagates_tool_error() {
        let mut registry = ToolRegistry::new();
        registry.register(StubTool {
            name: DISCORD_REGISTER_BOT_TOOL,
            reply: String::new(),
            fail: true,
        });
        let result = apply_discord_credentials(&mut registry, "tok").await;
        assert!(result.is_err());
    }
}
