// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Translation between the Chat Session Store's persisted [`iris_store::ChatMessage`]
//! shape and the Agent Runtime's prompt-facing [`iris_model::Message`] shape.
//!
//! Lives here rather than in `iris-store` or `iris-core` because it depends
//! on both of those crates' types and both are already dependencies of this
//! one; the HTTP edge (`iris-gateway`) calls into this module to build the
//! `history` argument for [`iris_core::Agent::run_turn`] and to shape what
//! it persists back afterwards.
//!
//! A persisted tool-result message's `value` is the JSON object
//! `{"tool_call_id": "...", "content": "..."}` — the only place that
//! convention is assumed is this module.

use iris_model::{Message, MessageContent as ModelContent, Role as ModelRole};
use iris_store::{ChatMessage, MessageContent as StoreContent, Role as StoreRole};

/// Converts persisted session history into the `Message` list
/// `iris_core::Agent::run_turn` expects, oldest first. A stored
/// `ToolInvocation` carrying several calls (one agent turn can request more
/// than one) expands into one `Message::ToolCall` per call, matching how
/// `iris-core` itself appends them during a turn.
pub fn store_messages_to_model(messages: &[ChatMessage]) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len());
    for msg in messages {
        match (msg.role, &msg.content) {
            (StoreRole::User, StoreContent::Text { text }) => out.push(Message::user(text.clone())),
            (StoreRole::Agent, StoreContent::Text { text }) => out.push(Message::assistant(text.clone())),
            (StoreRole::Agent, StoreContent::ToolInvocation { calls }) => {
                for call in calls {
                    out.push(Message {
                        role: ModelRole::Assistant,
                        content: ModelContent::ToolCall {
                            tool_call_id: call.id.clone(),
                            function: iris_model::FunctionCall {
                                name: call.name.clone(),
                                arguments: call.args.to_string(),
                            },
                        },
                    });
                }
            }
            (StoreRole::Tool, StoreContent::ToolResult { value }) => {
                let call_id = value
                    .get("tool_call_id")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                let content = value
                    .get("content")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string();
                out.push(Message::tool_result(call_id, content));
            }
            // A user/tool message whose content kind doesn't match its role
            // (e.g. a tool message persisted as plain text) still renders as
            // text so the model sees *something* rather than silently losing
            // the turn.
            (role, content) => out.push(Message {
                role: store_role_to_model_role(role),
                content: ModelContent::Text(content.as_text()),
            }),
        }
    }
    out
}

fn store_role_to_model_role(role: StoreRole) -> ModelRole {
    match role {
        StoreRole::User => ModelRole::User,
        StoreRole::Agent => ModelRole::Assistant,
        StoreRole::Tool => ModelRole::Tool,
    }
}

/// Builds the `MessageContent` to persist for a tool call the runtime just
/// issued, preserving the `{tool_call_id, content}` convention
/// [`store_messages_to_model`] expects on the way back.
pub fn tool_result_to_store_content(tool_call_id: &str, content: &str) -> StoreContent {
    StoreContent::ToolResult {
        value: serde_json::json!({ "tool_call_id": tool_call_id, "content": content }),
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use iris_store::ToolCallRecord;
    use uuid::Uuid;

    fn msg(role: StoreRole, content: StoreContent) -> ChatMessage {
        ChatMessage {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
            is_partial: false,
        }
    }

    #[test]
    fn text_messages_round_trip_role_and_text() {
        let messages = vec![
            msg(StoreRole::User, StoreContent::text("hi")),
            msg(StoreRole::Agent, StoreContent::text("hello")),
        ];
        let converted = store_messages_to_model(&messages);
        assert_eq!(converted.len(), 2);
        assert!(matches!(converted[0].role, ModelRole::User));
        assert_eq!(converted[0].as_text(), Some("hi"));
        assert!(matches!(converted[1].role, ModelRole::Assistant));
    }

    #[test]
    fn tool_invocation_expands_to_one_message_per_call() {
        let messages = vec![msg(
            StoreRole::Agent,
            StoreContent::ToolInvocation {
                calls: vec![
                    ToolCallRecord { id: "1".into(), name: "a".into(), args: serde_json::json!({}) },
                    ToolCallRecord { id: "2".into(), name: "b".into(), args: serde_json::json!({}) },
                ],
            },
        )];
        let converted = store_messages_to_model(&messages);
        assert_eq!(converted.len(), 2);
        match &converted[0].content {
            ModelContent::ToolCall { tool_call_id, function } => {
                assert_eq!(tool_call_id, "1");
                assert_eq!(function.name, "a");
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }

    #[test]
    fn tool_result_round_trips_through_the_convention() {
        let store_content = tool_result_to_store_content("call-1", "42 degrees");
        let message = msg(StoreRole::Tool, store_content);
        let converted = store_messages_to_model(std::slice::from_ref(&message));
        match &converted[0].content {
            ModelContent::ToolResult { tool_call_id, content } => {
                assert_eq!(tool_call_id, "call-1");
                assert_eq!(content.as_text(), Some("42 degrees"));
            }
            other => panic!("unexpected content: {other:?}"),
        }
    }
}
