// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
mod agent;
mod events;
mod prompts;
mod session;
mod truncate;

pub use agent::{Agent, TurnOutcome};
pub use events::RuntimeEvent;
pub use prompts::compose_system_prompt;
pub use session::{window, Session};
pub use truncate::truncate_tool_output;

/// Maximum number of prior messages kept in the model prompt (the system
/// message takes the remaining slot of the budget — see [`window`]).
pub const MAX_HISTORY_MESSAGES: usize = 10;

/// Maximum consecutive model <-> tool round trips before the runtime gives up
/// and returns a canned final reply.
pub const MAX_TOOL_ROUND_TRIPS: usize = 8;

/// Character budget for a single tool result appended to history.
pub const MAX_TOOL_OUTPUT_CHARS: usize = 1500;

/// Tool invocations are retried this many times after a transient failure.
pub const TOOL_RETRY_ATTEMPTS: usize = 2;

/// Backoff between tool retries.
pub const TOOL_RETRY_BACKOFF: std::time::Duration = std::time::Duration::from_millis(500);
