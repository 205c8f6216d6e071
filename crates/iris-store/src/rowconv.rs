// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Converts between the API-level [`crate::models::Role`] and the
//! `sender_type`/`message_type` vocabulary the `chat_messages` table's own
//! columns carry, per the Open Question resolution in `DESIGN.md`.
//!
//! Mapping: `user ↔ user`, `agent ↔ ai`, `tool ↔ tool`. This module is the
//! only place either vocabulary's string spelling is allowed to appear —
//! every other crate speaks `Role` exclusively.

use crate::models::Role;

pub fn role_to_sender_type(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Agent => "ai",
        Role::Tool => "tool",
    }
}

pub fn role_to_message_type(role: Role) -> &'static str {
    match role {
        Role::User => "human",
        Role::Agent => "ai",
        Role::Tool => "tool",
    }
}

pub fn sender_type_to_role(sender_type: &str) -> Option<Role> {
    match sender_type {
        "user" => Some(Role::User),
        "ai" => Some(Role::Agent),
        "tool" => Some(Role::Tool),
        _ => None,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
