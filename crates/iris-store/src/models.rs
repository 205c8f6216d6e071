// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The API-level role vocabulary. The only place the alternate
/// `sender_type`/`message_type` vocabulary survives is the row shape the
/// `chat_messages` table itself uses; see [`crate::rowconv`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    Tool,
}

/// One tool invocation requested by a model, as persisted inside a
/// [`MessageContent::ToolInvocation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub args: serde_json::Value,
}

/// The tagged payload of a [`ChatMessage`]. Stored as a single JSONB column
/// with a `kind` discriminant so round-tripping never loses the shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    ToolInvocation { calls: Vec<ToolCallRecord> },
    ToolResult { value: serde_json::Value },
}

impl MessageContent {
    pub fn text(s: impl Into<String>) -> Self {
        MessageContent::Text { text: s.into() }
    }

    /// The plain-text representation, used for broadcast payloads and
    /// prefix-of-final-message assertions. Non-text content renders as its
    /// JSON form.
    pub fn as_text(&self) -> String {
        match self {
            MessageContent::Text { text } => text.clone(),
            MessageContent::ToolInvocation { calls } => {
                serde_json::to_string(calls).unwrap_or_default()
            }
            MessageContent::ToolResult { value } => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: String,
    pub agent_id: Uuid,
    pub title: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: Role,
    pub content: MessageContent,
    pub timestamp: DateTime<Utc>,
    pub is_partial: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub session_id: Uuid,
    pub text: String,
    pub message_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The persisted shape of an [`iris_config::AgentConfig`]: the same
/// persona/model/tooling fields plus server-managed identity and usage
/// stats. `iris_store::agents` converts between the two at its boundary so
/// every other crate can keep using `iris_config::AgentConfig` as the one
/// agent-shaped type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: Uuid,
    pub user_id: String,
    pub config: iris_config::AgentConfig,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub config: serde_json::Value,
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_content_text_round_trips() {
        let c = MessageContent::text("hello");
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["kind"], "text");
        let back: MessageContent = serde_json::from_value(v).unwrap();
        assert_eq!(back.as_text(), "hello");
    }

    #[test]
    fn message_content_tool_invocation_round_trips() {
        let c = MessageContent::ToolInvocation {
            calls: vec![ToolCallRecord {
                id: "1".into(),
                name: "get_weather".into(),
                args: serde_json::json!({"city": "London"}),
            }],
        };
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["kind"], "tool_invocation");
        let back: MessageContent = serde_json::from_value(v).unwrap();
        match back {
            MessageContent::ToolInvocation { calls } => assert_eq!(calls[0].name, "get_weather"),
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Agent).unwrap(), "agent");
        assert_eq!(serde_json::to_value(Role::Tool).unwrap(), "tool");
    }
}
