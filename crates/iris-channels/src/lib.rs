// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Messaging channel integrations: inbound payload parsing for the
//! Telegram and Discord webhook surfaces (§6), shared between `iris-gateway`
//! (which owns the HTTP routes) and, when the `discord` feature is on, a
//! long-lived Discord gateway client that feeds the same inbound shape.
//!
//! Outbound delivery is never this crate's concern — `send_message` /
//! `send_message_telegram` are federated tools the model calls through
//! `iris-federation`, not something a channel client does directly.

pub mod discord;
pub mod telegram;

/// One inbound message normalised from either platform's webhook payload,
/// ready for `route_platform(platform, bot_id)` plus a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub bot_id: String,
    /// Platform-specific conversation identifier (Telegram chat id, Discord
    /// channel id). Opaque to the core; forwarded back to the send tool.
    pub chat_id: String,
    pub text: String,
}
