// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use iris_model::Message;

use crate::MAX_HISTORY_MESSAGES;

/// The working message list for one turn: a system message plus a bounded
/// window of prior history, mutated in place as `call_tool` appends tool
/// results and the loop returns to `call_model`.
#[derive(Debug, Clone)]
pub struct Session {
    pub system_prompt: String,
    pub messages: Vec<Message>,
}

impl Session {
    /// Build a turn's working session from the full persisted history plus
    /// the new user message, applying the history window immediately.
    pub fn new(system_prompt: String, history: &[Message], new_user_message: Message) -> Self {
        let mut messages = window(history).to_vec();
        messages.push(new_user_message);
        Self {
            system_prompt,
            messages,
        }
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    /// Build the prompt sent to the model: the system message followed by
    /// the (already-windowed) working history.
    pub fn prompt_messages(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        out.push(Message::system(self.system_prompt.clone()));
        out.extend(self.messages.iter().cloned());
        out
    }
}

/// Keep at most `MAX_HISTORY_MESSAGES - 1` most recent messages,
/// oldest-to-newest, leaving room for the system message in the model's
/// `MAX_HISTORY_MESSAGES`-message budget.
pub fn window(history: &[Message]) -> &[Message] {
    let cap = MAX_HISTORY_MESSAGES - 1;
    if history.len() <= cap {
        history
    } else {
        &history[history.len() - cap..]
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
