// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Credential-injection wrappers around federated tools.
//!
//! A platform tool server is generic: `send_message_telegram` takes the bot
//! token as a parameter like any other argument. The model should never see
//! or choose that token, so the Lifecycle Manager wraps the handful of
//! platform-specific tools with one of these once an agent's platform
//! credentials are known, stripping the credential parameters from the
//! schema the model sees and splicing them back in at call time.

use std::sync::Arc;

use async_trait::async_trait;
use iris_tools::{Tool, ToolCall, ToolOutput};
use serde_json::{json, Value};

/// Telegram tool names that require `telegram_api_id`/`telegram_api_hash`/
/// `telegram_bot_token` injected.
pub const TELEGRAM_WRAPPED_TOOLS: &[&str] =
    &["send_message_telegram", "get_chat_history", "get_bot_id_telegram"];

/// Discord tool names that require `bot_id` injected.
pub const DISCORD_WRAPPED_TOOLS: &[&str] = &["send_message", "get_channel_messages", "get_bot_id"];

/// Name of the one-shot, unwrapped bootstrap tool used to mint a Discord
/// `bot_id` from a bot token.
pub const DISCORD_REGISTER_BOT_TOOL: &str = "register_discord_bot";

#[derive(Debug, Clone)]
pub struct TelegramCredentials {
    pub api_id: i64,
    pub api_hash: String,
    pub bot_token: String,
}

/// Wraps a federated Telegram tool, injecting this agent's credentials into
/// every call and hiding the credential parameters from the schema handed
/// to the model.
pub struct TelegramToolWrapper {
    inner: Arc<dyn Tool>,
    creds: TelegramCredentials,
}

impl TelegramToolWrapper {
    pub fn new(inner: Arc<dyn Tool>, creds: TelegramCredentials) -> Self {
        Self { inner, creds }
    }
}

#[async_trait]
impl Tool for TelegramToolWrapper {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn parameters_schema(&self) -> Value {
        strip_properties(
            self.inner.parameters_schema(),
            &["telegram_api_id", "telegram_api_hash", "telegram_bot_token"],
        )
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let mut args = call.args.clone();
        inject(
            &mut args,
            &[
                ("telegram_api_id", json!(self.creds.api_id)),
                ("telegram_api_hash", json!(self.creds.api_hash)),
                ("telegram_bot_token", json!(self.creds.bot_token)),
            ],
        );
        let call = ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            args,
        };
        self.inner.execute(&call).await
    }
}

/// Wraps a federated Discord tool, injecting the bot id resolved at
/// materialisation time (via [`DISCORD_REGISTER_BOT_TOOL`]).
pub struct DiscordToolWrapper {
    inner: Arc<dyn Tool>,
    bot_id: String,
}

impl DiscordToolWrapper {
    pub fn new(inner: Arc<dyn Tool>, bot_id: String) -> Self {
        Self { inner, bot_id }
    }
}

#[async_trait]
impl Tool for DiscordToolWrapper {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn description(&self) -> &str {
        self.inner.description()
    }

    fn parameters_schema(&self) -> Value {
        strip_properties(self.inner.parameters_schema(), &["bot_id"])
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let mut args = call.args.clone();
        inject(&mut args, &[("bot_id", json!(self.bot_id))]);
        let call = ToolCall {
            id: call.id.clone(),
            name: call.name.clone(),
            args,
        };
        self.inner.execute(&call).await
    }
}

fn inject(args: &mut Value, pairs: &[(&str, Value)]) {
    if !args.is_object() {
        *args = json!({});
    }
    let map = args.as_object_mut().expect("just coerced to object above");
    for (key, value) in pairs {
        map.insert((*key).to_string(), value.clone());
    }
}

/// Remove the named properties (and drop them from `required`) from a JSON
/// Schema object, so the model is never shown parameters it must not set.
fn strip_properties(mut schema: Value, names: &[&str]) -> Value {
    if let Some(obj) = schema.as_object_mut() {
        if let Some(props) = obj.get_mut("properties").and_then(|p| p.as_object_mut()) {
            for name in names {
                props.remove(*name);
            }
        }
        if let Some(required) = obj.get_mut("required").and_then(|r| r.as_array_mut()) {
            required.retain(|v| !v.as_str().is_some_and(|s| names.contains(&s)));
        }
    }
    schema
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingTool {
        last_args: std::sync::Mutex<Option<Value>>,
    }

    #[async_trait]
    impl Tool for RecordingTool {
        fn name(&self) -> &str {
            "send_message_telegram"
        }
        fn description(&self) -> &str {
            "sends a telegram message"
        }
        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {
                    "chat_id": {"type": "string"},
                    "telegram_api_id": {"type": "integer"},
                    "telegram_api_hash": {"type": "string"},
                    "telegram_bot_token": {"type": "string"},
                },
                "required": ["chat_id", "telegram_bot_token"],
            })
        }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            *self.last_args.lock().unwrap() = Some(call.args.clone());
            ToolOutput::ok(&call.id, "sent")
        }
    }

    fn creds() -> TelegramCredentials {
        TelegramCredentials {
            api_id: 12345,
            api_hash: "hash".into(),
            bot_token: "token".into(),
        }
    }

    #[test]
    fn schema_hides_credential_params() {
        let inner = Arc::new(RecordingTool {
            last_args: std::sync::Mutex::new(None),
        });
        let wrapper = TelegramToolWrapper::new(inner, creds());
        let schema = wrapper.parameters_schema();
        let props = schema["properties"].as_object().unwrap();
        assert!(props.contains_key("chat_id"));
        assert!(!props.contains_key("telegram_api_id"));
        assert!(!props.contains_key("telegram_bot_token"));
        let required = schema["required"].as_array().unwrap();
        assert!(required.iter().any(|v| v == "chat_id"));
        assert!(!required.iter().any(|v| v == "telegram_bot_token"));
    }

    #[tokio::test]
    async fn execute_injects_credentials_into_call_args() {
        let inner = Arc::new(RecordingTool {
            last_args: std::sync::Mutex::new(None),
        });
        let wrapper = TelegramToolWrapper::new(inner.clone(), creds());
        let call = ToolCall {
            id: "c1".into(),
            name: "send_message_telegram".into(),
            args: json!({"chat_id": "42"}),
        };
        let out = wrapper.execute(&call).await;
        assert!(!out.is_error);

        let recorded = inner.last_args.lock().unwrap().clone().unwrap();
        assert_eq!(recorded["chat_id"], "42");
        assert_eq!(recorded["telegram_api_id"], 12345);
        assert_eq!(recorded["telegram_bot_token"], "token");
    }

    struct DiscordEchoTool;

    #[async_trait]
    impl Tool for DiscordEchoTool {
        fn name(&self) -> &str {
            "send_message"
        }
        fn description(&self) -> &str {
            "sends a discord message"
        }
        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": {"channel_id": {"type": "string"}, "bot_id": {"type": "string"}},
                "required": ["channel_id", "bot_id"],
            })
        }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            ToolOutput::ok(&call.id, call.args.to_string())
        }
    }

    #[tokio::test]
    async fn discord_wrapper_injects_bot_id() {
        let wrapper = DiscordToolWrapper::new(Arc::new(DiscordEchoTool), "bot-99".to_string());
        let call = ToolCall {
            id: "c1".into(),
            name: "send_message".into(),
            args: json!({"channel_id": "c"}),
        };
        let out = wrapper.execute(&call).await;
        assert!(out.content.contains("bot-99"));
    }

    #[test]
    fn discord_wrapper_schema_drops_bot_id() {
        let wrapper = DiscordToolWrapper::new(Arc::new(DiscordEchoTool), "bot-99".to_string());
        let schema = wrapper.parameters_schema();
        assert!(!schema["properties"]
            .as_object()
            .unwrap()
            .contains_key("bot_id"));
    }
}
