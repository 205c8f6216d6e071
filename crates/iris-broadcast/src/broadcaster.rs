// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The Streaming Broadcaster (§4.E): one `tokio::sync::broadcast` channel per
//! chat session, fed by [`crate::BroadcastEvent`]s and drained by duplex
//! socket bridges in `iris-gateway`.
//!
//! Delivery correctness — "no dropped events for connected subscribers",
//! "no event reaches an unsubscribed socket" — comes from the broadcast
//! channel primitive itself: a socket bridge that has dropped its
//! [`broadcast::Receiver`] simply stops receiving, with no action required
//! here. This crate only tracks *which* `(user_id, session_id)` pairs are
//! currently subscribed, for `subscriber_count` introspection and so
//! `unsubscribe` has something to remove.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::event::BroadcastEvent;

/// Channel capacity: how many events a lagging subscriber can fall behind
/// by before it starts missing some. Generous relative to the burst a
/// single streamed turn produces (one `llm_stream_chunk` per model text
/// delta plus one `message_created`).
const CHANNEL_CAPACITY: usize = 1024;

/// Opaque handle returned by [`Broadcaster::subscribe`]; pass it back to
/// [`Broadcaster::unsubscribe`] when the socket disconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

struct Subscription {
    #[allow(dead_code)] // kept for future audit/introspection surfaces
    user_id: String,
    session_id: Uuid,
}

/// Process-wide fan-out registry: `channel -> subscriber set`.
pub struct Broadcaster {
    channels: RwLock<HashMap<Uuid, broadcast::Sender<BroadcastEvent>>>,
    subscriptions: RwLock<HashMap<SubscriberId, Subscription>>,
    next_id: AtomicU64,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Authenticates happen at the edge (the caller already resolved
    /// `user_id` from the bearer token before calling this). Adds the
    /// socket to `chat-session-{session_id}` and returns a receiver plus
    /// the id to pass to [`Broadcaster::unsubscribe`] on disconnect.
    pub async fn subscribe(
        &self,
        user_id: impl Into<String>,
        session_id: Uuid,
    ) -> (SubscriberId, broadcast::Receiver<BroadcastEvent>) {
        let rx = {
            let channels = self.channels.read().await;
            if let Some(tx) = channels.get(&session_id) {
                tx.subscribe()
            } else {
                drop(channels);
                let mut channels = self.channels.write().await;
                let tx = channels
                    .entry(session_id)
                    .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
                tx.subscribe()
            }
        };

        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions.write().await.insert(
            id,
            Subscription {
                user_id: user_id.into(),
                session_id,
            },
        );
        (id, rx)
    }

    /// Removes a subscriber from every channel it appears in (in practice:
    /// the one channel it was subscribed to). Safe to call more than once.
    pub async fn unsubscribe(&self, id: SubscriberId) {
        self.subscriptions.write().await.remove(&id);
    }

    /// Publishes `event` to `chat-session-{event.session_id()}`. A session
    /// with no live subscribers is a no-op — there is nothing to retain
    /// events for (§4.E has no durable replay requirement; `iris-store`
    /// already persisted whatever this event describes).
    pub async fn broadcast(&self, event: BroadcastEvent) {
        let session_id = event.session_id();
        let channels = self.channels.read().await;
        if let Some(tx) = channels.get(&session_id) {
            // Err(SendError) only when there are zero receivers right now —
            // not an error condition, just nobody listening.
            let _ = tx.send(event);
        }
    }

    /// The loopback entry the Agent Runtime uses to emit events without
    /// holding a direct reference to this broadcaster (§4.E
    /// `publish_internal`). Identical to [`Broadcaster::broadcast`]; kept as
    /// a separate name so `iris-gateway`'s `/internal/broadcast` route reads
    /// as the thing the spec names.
    pub async fn publish_internal(&self, event: BroadcastEvent) {
        self.broadcast(event).await;
    }

    /// Number of sockets currently subscribed to `session_id`'s channel.
    pub async fn subscriber_count(&self, session_id: Uuid) -> usize {
        self.subscriptions
            .read()
            .await
            .values()
            .filter(|s| s.session_id == session_id)
            .count()
    }
}
