// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use iris_tools::{ToolOutput, ToolSchema};
use serde_json::Value;

/// A connected tool server this crate can list and dispatch to.
///
/// [`iris_mcp_client::RemoteToolServer`] is the only production
/// implementation; the trait exists so discovery and dispatch can be
/// exercised with an in-memory fake in tests, without spinning up a real MCP
/// server.
#[async_trait]
pub trait ToolSource: Send + Sync {
    async fn list_tools(&self) -> anyhow::Result<Vec<ToolSchema>>;
    async fn call_tool(&self, call_id: String, name: &str, args: Value) -> anyhow::Result<ToolOutput>;
}

#[async_trait]
impl ToolSource for iris_mcp_client::RemoteToolServer {
    async fn list_tools(&self) -> anyhow::Result<Vec<ToolSchema>> {
        iris_mcp_client::RemoteToolServer::list_tools(self).await
    }

    async fn call_tool(&self, call_id: String, name: &str, args: Value) -> anyhow::Result<ToolOutput> {
        iris_mcp_client::RemoteToolServer::call_tool(self, call_id, name, args).await
    }
}
