// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The Agent Runtime's turn loop: `call_model -> call_tool -> done`.
//!
//! One [`Agent`] is built per `RunningAgent` materialisation and reused
//! across turns; it owns no session state of its own (each call to
//! [`Agent::run_turn`] is handed a fresh [`Session`] built from persisted
//! history) so the same `Agent` can serve interleaved turns safely.

use std::sync::{Arc, OnceLock};

use futures::StreamExt;
use regex::Regex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use iris_model::{
    CompletionRequest, Message, ModelDelta, ModelProvider, ResponseEvent, ToolSchema as ModelToolSchema,
};
use iris_tools::{Tool, ToolCall, ToolErrorKind, ToolOutput, ToolRegistry};

use crate::events::RuntimeEvent;
use crate::session::Session;
use crate::truncate::truncate_tool_output;
use crate::{MAX_TOOL_ROUND_TRIPS, TOOL_RETRY_ATTEMPTS, TOOL_RETRY_BACKOFF};

/// Matches inline `<tool-use>...</tool-use>` pseudo-XML some providers emit
/// alongside a structured tool call. Stripped from the visible text before
/// a mixed text+tool-call reply is shown to the user.
fn tool_use_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<tool-use>.*?</tool-use>\s*").unwrap())
}

const CANNOT_COMPLETE_REPLY: &str =
    "I wasn't able to finish this after several tool attempts. Could you rephrase the request or break it into smaller steps?";

/// How a turn ended.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The turn reached `done`; this is the single final assistant reply
    /// that should be persisted with `is_partial=false`.
    Final(String),
    /// The turn was cancelled before reaching `done`. Any partial text
    /// already emitted via [`RuntimeEvent::TextDelta`] stays as-is; no
    /// final message should be persisted.
    Cancelled,
}

/// One agent's runtime: an opaque model, its federated tool set, and the
/// composed system prompt for its persona. Stateless across turns.
pub struct Agent {
    model: Arc<dyn ModelProvider>,
    tools: Arc<ToolRegistry>,
    system_prompt: String,
}

impl Agent {
    pub fn new(model: Arc<dyn ModelProvider>, tools: Arc<ToolRegistry>, system_prompt: String) -> Self {
        Self {
            model,
            tools,
            system_prompt,
        }
    }

    /// This agent's federated tool set, for callers that need to invoke a
    /// tool directly rather than through `run_turn` — the webhook edge
    /// does this to deliver a reply via the platform's `send_message` tool
    /// once a turn has produced it (§2.3: "Runtime produces a reply ->
    /// Tool Federation invokes the platform's send_message tool").
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Run one turn: `history` is the already-persisted prior conversation,
    /// `user_message` is the newly arrived message. `events` streams
    /// [`RuntimeEvent`]s to the caller as the turn progresses (typically
    /// forwarded into the Chat Session Store + Streaming Broadcaster).
    /// `cancel` is polled at each state-machine transition.
    pub async fn run_turn(
        &self,
        history: &[Message],
        user_message: Message,
        events: mpsc::Sender<RuntimeEvent>,
        cancel: CancellationToken,
    ) -> anyhow::Result<TurnOutcome> {
        let mut session = Session::new(self.system_prompt.clone(), history, user_message);
        let model_tools = to_model_schemas(&self.tools);
        let mut rounds: usize = 0;

        loop {
            if cancel.is_cancelled() {
                return Ok(TurnOutcome::Cancelled);
            }

            match self.call_model(&session, &model_tools, &events).await? {
                ModelReply::Text(text) => return Ok(TurnOutcome::Final(text)),
                ModelReply::ToolCalls(calls) => {
                    if cancel.is_cancelled() {
                        return Ok(TurnOutcome::Cancelled);
                    }
                    if rounds >= MAX_TOOL_ROUND_TRIPS {
                        return Ok(TurnOutcome::Final(CANNOT_COMPLETE_REPLY.to_string()));
                    }
                    self.call_tool(&mut session, calls, &events).await;
                    rounds += 1;
                }
                ModelReply::Error(msg) => {
                    let _ = events.send(RuntimeEvent::Error(msg.clone())).await;
                    // A model transport error aborts the turn (§7:
                    // ModelError->500, §4.B "surface an error to the
                    // caller") rather than completing it — propagate so the
                    // caller (the gateway's `turn::drive`) persists the
                    // human-readable final message and maps this to a 500,
                    // instead of silently returning 200 with error text.
                    return Err(anyhow::anyhow!(msg));
                }
            }
        }
    }

    /// Stream one model completion and classify the reply.
    ///
    /// Text deltas are forwarded live while no tool call has been seen yet.
    /// Once a tool call arrives, further text is accumulated only (not
    /// streamed) so the final classification — pure text, pure tool calls,
    /// or a mix where the visible text wins once `<tool-use>` tags are
    /// stripped — can be made once the full reply is in.
    async fn call_model(
        &self,
        session: &Session,
        tools: &[ModelToolSchema],
        events: &mpsc::Sender<RuntimeEvent>,
    ) -> anyhow::Result<ModelReply> {
        let req = CompletionRequest {
            messages: session.prompt_messages(),
            tools: tools.to_vec(),
            stream: true,
            system_dynamic_suffix: None,
        };

        let mut stream = match self.model.complete(req).await {
            Ok(s) => s,
            Err(e) => return Ok(ModelReply::Error(e.to_string())),
        };

        let mut raw_text = String::new();
        let mut suppress_streaming = false;
        let mut tool_calls: Vec<ToolCall> = Vec::new();

        while let Some(item) = stream.next().await {
            let event = match item {
                Ok(ev) => ev,
                Err(e) => return Ok(ModelReply::Error(e.to_string())),
            };
            if let ResponseEvent::Error(msg) = &event {
                return Ok(ModelReply::Error(msg.clone()));
            }
            match Option::<ModelDelta>::from(event) {
                Some(ModelDelta::Text(delta)) => {
                    raw_text.push_str(&delta);
                    if !suppress_streaming {
                        let _ = events.send(RuntimeEvent::TextDelta(delta)).await;
                    }
                }
                Some(ModelDelta::ToolCall { id, name, arguments }) => {
                    suppress_streaming = true;
                    let args = serde_json::from_str(&arguments).unwrap_or(serde_json::Value::Null);
                    tool_calls.push(ToolCall { id, name, args });
                }
                Some(ModelDelta::End) | None => {}
            }
        }

        if tool_calls.is_empty() {
            return Ok(ModelReply::Text(raw_text));
        }

        // Only strip <tool-use> spans here; don't additionally trim the
        // whole string; whatever text already streamed as deltas must stay
        // a verbatim prefix of whatever we return as the final text.
        let cleaned = tool_use_tag().replace_all(&raw_text, "").into_owned();
        if cleaned.trim().is_empty() {
            Ok(ModelReply::ToolCalls(tool_calls))
        } else {
            Ok(ModelReply::Text(cleaned))
        }
    }

    /// Execute every tool call the model requested in one round, appending
    /// the assistant's tool-call message and each tool's result to the
    /// working session, with retry on transient failures.
    async fn call_tool(
        &self,
        session: &mut Session,
        calls: Vec<ToolCall>,
        events: &mpsc::Sender<RuntimeEvent>,
    ) {
        for call in calls {
            let _ = events.send(RuntimeEvent::ToolCallStarted(call.clone())).await;

            session.push(Message {
                role: iris_model::Role::Assistant,
                content: iris_model::MessageContent::ToolCall {
                    tool_call_id: call.id.clone(),
                    function: iris_model::FunctionCall {
                        name: call.name.clone(),
                        arguments: call.args.to_string(),
                    },
                },
            });

            let outcome = self.execute_with_retry(&call).await;
            let content = if outcome.is_error {
                outcome.content.clone()
            } else {
                truncate_tool_output(&outcome.content)
            };

            session.push(Message::tool_result(&call.id, content.clone()));

            let _ = events
                .send(RuntimeEvent::ToolCallFinished {
                    call_id: call.id,
                    tool_name: call.name,
                    output: content,
                    is_error: outcome.is_error,
                })
                .await;
        }
    }

    async fn execute_with_retry(&self, call: &ToolCall) -> ToolOutput {
        let mut attempt = 0;
        loop {
            let out = self.tools.execute(call).await;
            if out.error_kind != ToolErrorKind::Transient || attempt >= TOOL_RETRY_ATTEMPTS {
                return out;
            }
            attempt += 1;
            tokio::time::sleep(TOOL_RETRY_BACKOFF).await;
        }
    }
}

enum ModelReply {
    Text(String),
    ToolCalls(Vec<ToolCall>),
    Error(String),
}

fn to_model_schemas(tools: &ToolRegistry) -> Vec<ModelToolSchema> {
    tools
        .schemas()
        .into_iter()
        .map(|s| ModelToolSchema {
            name: s.name,
            description: s.description,
            parameters: s.parameters,
        })
        .collect()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
