// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;

use async_trait::async_trait;
use iris_tools::{Tool, ToolCall, ToolOutput};
use serde_json::Value;
use tracing::warn;

use crate::tool_source::ToolSource;

/// A proxy for one tool exposed by a remote MCP server.
///
/// Registered directly into a `RunningAgent`'s `ToolRegistry` for servers
/// that don't need credential injection; wrapped by
/// [`crate::wrappers::PlatformCredentialWrapper`] for the handful that do.
pub struct FederatedTool {
    server: Arc<dyn ToolSource>,
    name: String,
    description: String,
    parameters: Value,
}

impl FederatedTool {
    pub fn new(
        server: Arc<dyn ToolSource>,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            server,
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

#[async_trait]
impl Tool for FederatedTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Value {
        self.parameters.clone()
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        match self
            .server
            .call_tool(call.id.clone(), &call.name, call.args.clone())
            .await
        {
            Ok(output) => output,
            Err(err) => {
                warn!(tool = %self.name, error = %err, "federated tool call failed");
                ToolOutput::transient(&call.id, format!("tool server error: {err}"))
            }
        }
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FakeServer {
        reply: String,
        fail: bool,
    }

    #[async_trait]
    impl ToolSource for FakeServer {
        async fn list_tools(&self) -> anyhow::Result<Vec<iris_tools::ToolSchema>> {
            Ok(vec![])
        }

        async fn call_tool(
            &self,
            call_id: String,
            _name: &str,
            _args: Value,
        ) -> anyhow::Result<ToolOutput> {
            if self.fail {
                anyhow::bail!("boom");
            }
            Ok(ToolOutput::ok(call_id, self.reply.clone()))
        }
    }

    #[tokio::test]
    async fn execute_forwards_to_server() {
        let server = Arc::new(FakeServer {
            reply: "hi".into(),
            fail: false,
        });
        let tool = FederatedTool::new(server, "echo", "echoes", json!({"type":"object"}));
        let call = ToolCall {
            id: "1".into(),
            name: "echo".into(),
            args: json!({}),
        };
        let out = tool.execute(&call).await;
        assert!(!out.is_error);
        assert_eq!(out.content, "hi");
    }

    #[tokio::test]
    async fn execute_maps_connection_error_to_transient() {
        let server = Arc::new(FakeServer {
            reply: String::new(),
            fail: true,
        });
        let tool = FederatedTool::new(server, "echo", "echoes", json!({"type":"object"}));
        let call = ToolCall {
            id: "1".into(),
            name: "echo".into(),
            args: json!({}),
        };
        let out = tool.execute(&call).await;
        assert!(out.is_error);
        assert_eq!(out.error_kind, iris_tools::ToolErrorKind::Transient);
    }
}
