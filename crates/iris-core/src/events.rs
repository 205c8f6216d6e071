// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use iris_tools::ToolCall;

/// Events emitted by the Agent Runtime during a single turn.
///
/// The Lifecycle Manager / HTTP edge drives the Chat Session Store and the
/// Streaming Broadcaster from these: each [`RuntimeEvent::TextDelta`] is
/// persisted as a partial `ChatMessage` and published as `llm_stream_chunk`.
/// The single accumulated final reply is not an event at all — it is
/// [`crate::TurnOutcome::Final`], returned once `run_turn` completes, which
/// the caller persists with `is_partial=false` and publishes as
/// `message_created`; likewise a model transport error surfaces as an `Err`
/// from `run_turn` rather than a `RuntimeEvent`.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A text fragment streamed from the model during `call_model`.
    TextDelta(String),
    /// The model requested a tool call; about to enter `call_tool`.
    ToolCallStarted(ToolCall),
    /// A tool call finished (successfully or with an absorbed error).
    ToolCallFinished {
        call_id: String,
        tool_name: String,
        output: String,
        is_error: bool,
    },
    /// The turn aborted due to a `ModelError`. Sent before `run_turn`
    /// returns `Err`, so a caller watching the event stream without
    /// awaiting the whole turn still learns why it ended.
    Error(String),
}
