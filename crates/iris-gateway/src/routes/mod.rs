// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Route handlers grouped the way §6 groups the external surface: agent
//! management, chat sessions, webhooks, and the internal loopback route.

pub mod agents;
pub mod internal;
pub mod sessions;
pub mod webhooks;
