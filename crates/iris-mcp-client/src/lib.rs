// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Thin `rmcp`-based client for a single remote MCP tool server.
//!
//! Mirrors `sven-mcp`'s server-side bridge in reverse: the same
//! `rmcp::model` wire types cross the protocol, just from the calling side
//! instead of the serving side. Conversions to/from [`iris_tools`] types go
//! through `serde_json` rather than rmcp's Rust-side field names, since the
//! MCP content/tool shapes (`type`/`text`/`data`/`mimeType`/`inputSchema`)
//! are the actual wire contract and are more stable than any one SDK
//! version's struct layout.

use rmcp::model::{CallToolRequestParam, CallToolResult, Tool as McpTool};
use rmcp::service::{RunningService, ServiceExt};
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::RoleClient;

use iris_tools::{ToolOutput, ToolOutputPart, ToolSchema};

/// A live connection to one remote MCP tool server, reachable over
/// streamable-HTTP (the transport every server in this deployment uses).
pub struct RemoteToolServer {
    service: RunningService<RoleClient, ()>,
}

impl RemoteToolServer {
    /// Establish a connection to `url`. Makes exactly one attempt; the Tool
    /// Federation Layer's discovery loop applies its own retry/backoff
    /// around this call.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let transport = StreamableHttpClientTransport::from_uri(url.to_string());
        let service = ().serve(transport).await?;
        Ok(Self { service })
    }

    /// Fetch this server's tool catalogue as [`iris_tools::ToolSchema`]s.
    pub async fn list_tools(&self) -> anyhow::Result<Vec<ToolSchema>> {
        let result = self.service.list_tools(None).await?;
        Ok(result.tools.iter().map(mcp_tool_to_schema).collect())
    }

    /// Invoke one remote tool by name.
    pub async fn call_tool(
        &self,
        call_id: impl Into<String>,
        name: &str,
        arguments: serde_json::Value,
    ) -> anyhow::Result<ToolOutput> {
        let params = CallToolRequestParam {
            name: name.to_string().into(),
            arguments: value_to_arguments(arguments),
        };
        let result = self.service.call_tool(params).await?;
        Ok(call_result_to_output(call_id, result))
    }

    /// Close the connection.
    pub async fn close(self) -> anyhow::Result<()> {
        self.service.cancel().await?;
        Ok(())
    }
}

fn value_to_arguments(v: serde_json::Value) -> Option<serde_json::Map<String, serde_json::Value>> {
    match v {
        serde_json::Value::Object(map) => Some(map),
        serde_json::Value::Null => None,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            Some(map)
        }
    }
}

/// Convert a remote `inputSchema`/`name`/`description` tool descriptor into
/// the local [`ToolSchema`] shape used by `ToolRegistry`.
pub fn mcp_tool_to_schema(tool: &McpTool) -> ToolSchema {
    let v = serde_json::to_value(tool).unwrap_or(serde_json::Value::Null);
    ToolSchema {
        name: v
            .get("name")
            .and_then(|n| n.as_str())
            .unwrap_or_default()
            .to_string(),
        description: v
            .get("description")
            .and_then(|d| d.as_str())
            .unwrap_or_default()
            .to_string(),
        parameters: v
            .get("inputSchema")
            .cloned()
            .unwrap_or_else(|| serde_json::json!({ "type": "object" })),
    }
}

/// Convert an MCP `CallToolResult` into a local [`ToolOutput`].
pub fn call_result_to_output(call_id: impl Into<String>, result: CallToolResult) -> ToolOutput {
    let call_id = call_id.into();
    let is_error = result.is_error.unwrap_or(false);

    let parts: Vec<ToolOutputPart> = result
        .content
        .iter()
        .filter_map(|c| {
            let v = serde_json::to_value(c).ok()?;
            match v.get("type").and_then(|t| t.as_str()) {
                Some("text") => v
                    .get("text")
                    .and_then(|t| t.as_str())
                    .map(|s| ToolOutputPart::Text(s.to_string())),
                Some("image") => {
                    let data = v.get("data").and_then(|d| d.as_str())?;
                    let mime = v
                        .get("mimeType")
                        .and_then(|m| m.as_str())
                        .unwrap_or("application/octet-stream");
                    Some(ToolOutputPart::Image(format!("data:{mime};base64,{data}")))
                }
                _ => None,
            }
        })
        .collect();

    if is_error {
        let text = parts
            .iter()
            .filter_map(|p| match p {
                ToolOutputPart::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        let text = if text.is_empty() {
            "remote tool returned an error".to_string()
        } else {
            text
        };
        ToolOutput::err(call_id, text)
    } else if parts.is_empty() {
        ToolOutput::ok(call_id, "")
    } else {
        ToolOutput::with_parts(call_id, parts)
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
