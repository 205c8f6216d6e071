// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Chat Session Store: Postgres-backed persistence for agents, the tool
//! catalogue, chat sessions, messages and auto-generated summaries.
//!
//! `iris_config::AgentConfig` is the one agent-shaped type every other
//! crate uses; this crate's [`models::AgentRecord`] only adds the
//! server-managed identity/timestamp fields around it. The alternate
//! `sender_type`/`message_type` row vocabulary never escapes
//! [`rowconv`] — every public function here speaks [`models::Role`].

mod agents;
mod error;
mod models;
pub mod rowconv;
mod sessions;
mod store;
mod tools;

pub use error::{StoreError, StoreResult};
pub use models::{AgentRecord, ChatMessage, ChatSession, ChatSummary, MessageContent, Role, ToolCallRecord, ToolRecord};
pub use sessions::SUMMARY_STRIDE;
pub use store::Store;
