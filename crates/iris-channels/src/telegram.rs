// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `POST /telegram/webhook` payload parsing (§6).
//!
//! The body is one of two shapes:
//! - a direct platform payload: `{bot_id, message: {chat: {id}, text}}`
//! - a forwarded payload a relay already flattened: `{bot_id, chat_id, content}`
//!
//! Either shape missing its essentials (`bot_id`, a chat id, non-empty text)
//! means "ignore this webhook", not an error — the edge answers
//! `200 {"status":"ignored"}` rather than a 4xx, since a webhook provider
//! will retry on non-2xx and there is nothing wrong with the *request*.

use serde::Deserialize;
use serde_json::Value;

use crate::InboundMessage;

#[derive(Debug, Deserialize)]
struct DirectPayload {
    bot_id: Option<String>,
    message: Option<DirectMessage>,
}

#[derive(Debug, Deserialize)]
struct DirectMessage {
    chat: DirectChat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DirectChat {
    id: Value,
}

#[derive(Debug, Deserialize)]
struct ForwardedPayload {
    bot_id: Option<String>,
    chat_id: Option<Value>,
    content: Option<String>,
}

/// Parses a raw `POST /telegram/webhook` body into a normalised
/// [`InboundMessage`]. Returns `None` for anything missing an essential
/// field, regardless of which of the two shapes it otherwise resembles.
pub fn parse_webhook(body: &Value) -> Option<InboundMessage> {
    if let Some(msg) = parse_direct(body) {
        return Some(msg);
    }
    parse_forwarded(body)
}

fn parse_direct(body: &Value) -> Option<InboundMessage> {
    let payload: DirectPayload = serde_json::from_value(body.clone()).ok()?;
    let bot_id = payload.bot_id?;
    let message = payload.message?;
    let chat_id = value_to_id_string(&message.chat.id)?;
    let text = message.text?;
    non_empty(bot_id, chat_id, text)
}

fn parse_forwarded(body: &Value) -> Option<InboundMessage> {
    let payload: ForwardedPayload = serde_json::from_value(body.clone()).ok()?;
    let bot_id = payload.bot_id?;
    let chat_id = value_to_id_string(&payload.chat_id?)?;
    let text = payload.content?;
    non_empty(bot_id, chat_id, text)
}

fn non_empty(bot_id: String, chat_id: String, text: String) -> Option<InboundMessage> {
    if bot_id.is_empty() || chat_id.is_empty() || text.is_empty() {
        return None;
    }
    Some(InboundMessage { bot_id, chat_id, text })
}

/// Telegram chat ids arrive as either a JSON number or a string depending on
/// the payload shape; normalise both to a string.
fn value_to_id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
