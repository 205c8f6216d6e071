// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;
use std::time::Duration;

use iris_tools::ToolRegistry;
use tracing::{info, warn};

use crate::endpoint::{Transport, ToolServerEndpoint};
use crate::federated_tool::FederatedTool;
use crate::tool_source::ToolSource;

/// Connection attempts per server before giving up on it.
pub const DISCOVERY_ATTEMPTS: u32 = 3;
/// `2^attempt` seconds between failed attempts (2s, then 4s).
pub const DISCOVERY_BACKOFF_BASE_SECS: u64 = 2;

/// One server that failed to discover after exhausting all retries.
#[derive(Debug, Clone)]
pub struct DiscoveryFailure {
    pub endpoint_id: String,
    pub error: String,
}

/// Result of federating a set of tool server endpoints: a populated
/// registry plus a record of any servers that could not be reached.
///
/// A failed server never blocks the others — an agent with three tool
/// servers configured, one of which is down, still starts with the other
/// two tools available.
pub struct DiscoveryOutcome {
    pub registry: ToolRegistry,
    pub failures: Vec<DiscoveryFailure>,
}

/// Dial one endpoint, retrying up to [`DISCOVERY_ATTEMPTS`] times with
/// exponential backoff (base [`DISCOVERY_BACKOFF_BASE_SECS`]) between
/// attempts.
async fn connect_with_retry<F, Fut>(
    endpoint: &ToolServerEndpoint,
    connect: &F,
) -> anyhow::Result<Arc<dyn ToolSource>>
where
    F: Fn(&str) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<Arc<dyn ToolSource>>>,
{
    let mut last_err = None;
    for attempt in 1..=DISCOVERY_ATTEMPTS {
        match connect(&endpoint.url).await {
            Ok(source) => return Ok(source),
            Err(err) => {
                warn!(
                    endpoint = %endpoint.id,
                    attempt,
                    error = %err,
                    "tool server discovery attempt failed"
                );
                last_err = Some(err);
                if attempt < DISCOVERY_ATTEMPTS {
                    let backoff = DISCOVERY_BACKOFF_BASE_SECS.pow(attempt);
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no connection attempts were made")))
}

/// Connect to every endpoint and register each server's tools, isolating
/// per-server failures. Uses the real `iris_mcp_client::RemoteToolServer`
/// connector; see [`discover_with`] to inject a fake connector for tests.
pub async fn discover(endpoints: &[ToolServerEndpoint]) -> DiscoveryOutcome {
    discover_with(endpoints, &default_connector).await
}

async fn default_connector(url: &str) -> anyhow::Result<Arc<dyn ToolSource>> {
    let server = iris_mcp_client::RemoteToolServer::connect(url).await?;
    Ok(Arc::new(server) as Arc<dyn ToolSource>)
}

/// Same as [`discover`] but with the connector function injected, so tests
/// can exercise the retry/backoff and partial-failure behaviour without a
/// live MCP server.
pub async fn discover_with<F, Fut>(endpoints: &[ToolServerEndpoint], connect: &F) -> DiscoveryOutcome
where
    F: Fn(&str) -> Fut,
    Fut: std::future::Future<Output = anyhow::Result<Arc<dyn ToolSource>>>,
{
    let mut registry = ToolRegistry::new();
    let mut failures = Vec::new();

    for endpoint in endpoints {
        if endpoint.transport != Transport::StreamableHttp {
            failures.push(DiscoveryFailure {
                endpoint_id: endpoint.id.clone(),
                error: "transport not yet supported".to_string(),
            });
            continue;
        }

        match connect_with_retry(endpoint, connect).await {
            Ok(source) => match source.list_tools().await {
                Ok(schemas) => {
                    info!(endpoint = %endpoint.id, count = schemas.len(), "discovered remote tools");
                    for schema in schemas {
                        let tool = FederatedTool::new(
                            source.clone(),
                            schema.name,
                            schema.description,
                            schema.parameters,
                        );
                        registry.register(tool);
                    }
                }
                Err(err) => {
                    warn!(endpoint = %endpoint.id, error = %err, "failed to list remote tools");
                    failures.push(DiscoveryFailure {
                        endpoint_id: endpoint.id.clone(),
                        error: err.to_string(),
                    });
                }
            },
            Err(err) => {
                warn!(endpoint = %endpoint.id, error = %err, "giving up on tool server after retries");
                failures.push(DiscoveryFailure {
                    endpoint_id: endpoint.id.clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    DiscoveryOutcome { registry, failures }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
