// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Agent Lifecycle Manager (component C): materialises `RunningAgent`s from
//! persisted [`iris_config::AgentConfig`]s and routes inbound platform
//! messages to the right one.

mod convert;
mod error;
mod manager;
mod materialize;
mod running_agent;

pub use convert::{store_messages_to_model, tool_result_to_store_content};
pub use error::{LifecycleError, LifecycleResult};
pub use manager::LifecycleManager;
pub use materialize::{build_endpoints, build_model_config};
pub use running_agent::{Platform, RunningAgent};
