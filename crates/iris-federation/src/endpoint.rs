// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// Wire transport a tool server is reached over.
///
/// Every server in this deployment speaks streamable-HTTP today; `Sse` is
/// modelled because `rmcp` ships the client transport for it, but
/// [`crate::discovery::connect`] does not dial it yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    StreamableHttp,
    Sse,
}

/// One remote tool server an agent is configured to federate with.
///
/// Built by the Lifecycle Manager from an agent's tool bindings plus the
/// platform-specific endpoints it adds when credentials are present (§4.C).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolServerEndpoint {
    pub id: String,
    pub url: String,
    pub transport: Transport,
}

impl ToolServerEndpoint {
    pub fn streamable_http(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            transport: Transport::StreamableHttp,
        }
    }
}
