// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The five event kinds the Streaming Broadcaster fans out (§4.E).

use serde_json::{json, Value};
use uuid::Uuid;

/// An event bound for one session's subscribers.
///
/// Each variant carries its own session id so a `Broadcaster` can route it
/// without the caller naming a channel separately.
#[derive(Debug, Clone)]
pub enum BroadcastEvent {
    SessionCreated { session_id: Uuid, session: Value },
    SessionUpdated { session_id: Uuid, session: Value },
    MessageCreated { session_id: Uuid, message: Value },
    LlmStreamChunk { session_id: Uuid, delta: String },
    Error { session_id: Uuid, message: String },
}

impl BroadcastEvent {
    pub fn session_created(session_id: Uuid, session: Value) -> Self {
        Self::SessionCreated { session_id, session }
    }

    pub fn session_updated(session_id: Uuid, session: Value) -> Self {
        Self::SessionUpdated { session_id, session }
    }

    pub fn message_created(session_id: Uuid, message: Value) -> Self {
        Self::MessageCreated { session_id, message }
    }

    pub fn llm_stream_chunk(session_id: Uuid, delta: impl Into<String>) -> Self {
        Self::LlmStreamChunk { session_id, delta: delta.into() }
    }

    pub fn error(session_id: Uuid, message: impl Into<String>) -> Self {
        Self::Error { session_id, message: message.into() }
    }

    pub fn session_id(&self) -> Uuid {
        match self {
            Self::SessionCreated { session_id, .. }
            | Self::SessionUpdated { session_id, .. }
            | Self::MessageCreated { session_id, .. }
            | Self::LlmStreamChunk { session_id, .. }
            | Self::Error { session_id, .. } => *session_id,
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session_created",
            Self::SessionUpdated { .. } => "session_updated",
            Self::MessageCreated { .. } => "message_created",
            Self::LlmStreamChunk { .. } => "llm_stream_chunk",
            Self::Error { .. } => "error",
        }
    }

    /// The channel name a subscriber socket is tagged with:
    /// `"chat-session-" + session_id`.
    pub fn channel(&self) -> String {
        channel_name(self.session_id())
    }

    /// Serialises this event to the `{type, channel, data}` wire frame
    /// subscribers receive as a single text frame.
    pub fn to_wire_frame(&self) -> Value {
        let data = match self {
            Self::SessionCreated { session, .. } | Self::SessionUpdated { session, .. } => {
                json!({ "session": session })
            }
            Self::MessageCreated { message, .. } => json!({ "message": message }),
            Self::LlmStreamChunk { delta, .. } => json!({ "delta": delta }),
            Self::Error { message, .. } => json!({ "message": message }),
        };
        json!({ "type": self.event_type(), "channel": self.channel(), "data": data })
    }
}

pub(crate) fn channel_name(session_id: Uuid) -> String {
    format!("chat-session-{session_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_frame_shapes_message_created() {
        let session_id = Uuid::nil();
        let event = BroadcastEvent::message_created(session_id, json!({"text": "hi"}));
        let frame = event.to_wire_frame();
        assert_eq!(frame["type"], "message_created");
        assert_eq!(frame["channel"], format!("chat-session-{session_id}"));
        assert_eq!(frame["data"]["message"]["text"], "hi");
    }

    #[test]
    fn wire_frame_shapes_llm_stream_chunk() {
        let event = BroadcastEvent::llm_stream_chunk(Uuid::nil(), "partial");
        let frame = event.to_wire_frame();
        assert_eq!(frame["type"], "llm_stream_chunk");
        assert_eq!(frame["data"]["delta"], "partial");
    }

    #[test]
    fn session_id_accessor_matches_every_variant() {
        let id = Uuid::nil();
        assert_eq!(BroadcastEvent::session_created(id, json!({})).session_id(), id);
        assert_eq!(BroadcastEvent::error(id, "oops").session_id(), id);
    }
}
