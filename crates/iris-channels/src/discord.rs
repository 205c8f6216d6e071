// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! `POST /discord/receive_message` payload parsing (§6), plus — behind the
//! `discord` feature — a long-lived gateway client that feeds the same
//! normalised shape from a live Discord connection rather than a relay's
//! webhook call.

use serde::Deserialize;

use crate::InboundMessage;

/// The exact body shape §6 specifies for `POST /discord/receive_message`.
#[derive(Debug, Deserialize)]
pub struct DiscordReceiveMessage {
    pub content: String,
    pub channel_id: String,
    pub author_id: String,
    pub author_name: String,
    pub message_id: String,
    pub timestamp: String,
    pub guild_id: Option<String>,
    pub bot_id: String,
}

impl DiscordReceiveMessage {
    /// Normalises into the same [`InboundMessage`] shape Telegram produces.
    /// Returns `None` if `content` or `bot_id` is empty — an empty-content
    /// Discord event (e.g. a pure-attachment message) carries nothing a
    /// text-only turn can act on.
    pub fn into_inbound(self) -> Option<InboundMessage> {
        if self.content.is_empty() || self.bot_id.is_empty() {
            return None;
        }
        Some(InboundMessage {
            bot_id: self.bot_id,
            chat_id: self.channel_id,
            text: self.content,
        })
    }
}

#[cfg(feature = "discord")]
pub use gateway::{run_gateway_client, InboundHandler};

#[cfg(feature = "discord")]
mod gateway {
    //! A minimal `serenity` `EventHandler` that turns live Discord messages
    //! into the same [`InboundMessage`] shape the webhook route parses,
    //! so both entry points converge on one "handle an inbound platform
    //! message" call site in `iris-gateway`.

    use async_trait::async_trait;
    use serenity::all::{Context, EventHandler, GatewayIntents, Message, Ready};
    use serenity::Client;
    use tracing::{error, info, warn};

    use super::InboundMessage;

    /// Implemented by `iris-gateway`: the single place inbound platform
    /// messages are resolved to an agent and run through a turn,
    /// regardless of whether they arrived over the gateway or a webhook.
    #[async_trait]
    pub trait InboundHandler: Send + Sync + 'static {
        async fn handle(&self, msg: InboundMessage);
    }

    struct Bridge<H: InboundHandler> {
        handler: H,
        /// Never reply to the bot's own messages — Discord gateway clients
        /// receive every message in channels they can see, including their
        /// own sends.
        bot_user_id: std::sync::OnceLock<u64>,
    }

    #[async_trait]
    impl<H: InboundHandler> EventHandler for Bridge<H> {
        async fn ready(&self, _ctx: Context, ready: Ready) {
            let _ = self.bot_user_id.set(ready.user.id.get());
            info!(bot = %ready.user.name, "discord gateway client connected");
        }

        async fn message(&self, _ctx: Context, msg: Message) {
            if self.bot_user_id.get() == Some(&msg.author.id.get()) {
                return;
            }
            if msg.content.is_empty() {
                return;
            }
            self.handler
                .handle(InboundMessage {
                    bot_id: self
                        .bot_user_id
                        .get()
                        .map(|id| id.to_string())
                        .unwrap_or_default(),
                    chat_id: msg.channel_id.get().to_string(),
                    text: msg.content.clone(),
                })
                .await;
        }
    }

    /// Runs a Discord gateway connection for one bot token until it
    /// disconnects or errors. `iris-gateway` spawns one of these per agent
    /// with a configured `discord_bot_token`, passing itself as `handler`.
    pub async fn run_gateway_client(bot_token: &str, handler: impl InboundHandler) -> anyhow::Result<()> {
        let intents = GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let mut client = Client::builder(bot_token, intents)
            .event_handler(Bridge {
                handler,
                bot_user_id: std::sync::OnceLock::new(),
            })
            .await?;

        if let Err(err) = client.start().await {
            error!(error = %err, "discord gateway client terminated");
            warn!("reconnect is the caller's responsibility (see iris-gateway's supervising task)");
            return Err(err.into());
        }
        Ok(())
    }
}
