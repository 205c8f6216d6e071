// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! Builds the pieces a `RunningAgent` is assembled from: the effective
//! `ModelConfig`, the set of tool server endpoints to federate with, and the
//! bot-id bootstrap calls (§4.C "Materialisation").

use iris_config::{AgentConfig, AgentSecrets, ModelConfig};
use iris_federation::ToolServerEndpoint;

/// Resolves the API key for `provider` from an agent's own secrets,
/// mirroring `agent_manager.py::create_dynamic_agent_instance`'s
/// `agent_secret or env_var` precedence: an agent-scoped key always wins
/// over the process-wide default.
fn agent_api_key(secrets: &AgentSecrets, provider: &str) -> Option<String> {
    match provider {
        "anthropic" => secrets.anthropic_api_key.clone(),
        "openai" | "azure" | "openrouter" | "litellm" => secrets.openai_api_key.clone(),
        "google" => secrets.google_api_key.clone(),
        "groq" => secrets.groq_api_key.clone(),
        "cohere" => secrets.cohere_api_key.clone(),
        _ => None,
    }
}

/// Builds the effective `ModelConfig` for one agent: provider and model name
/// come from the agent's own config, connection details (base URL, Azure
/// deployment info, driver-specific extras, prompt-caching flags) come from
/// the process-wide default for that provider family, and the API key
/// resolves agent-secret-first, process-default-second.
pub fn build_model_config(agent: &AgentConfig, process_default: &ModelConfig) -> ModelConfig {
    let provider = agent.model_provider.clone();
    let name = agent
        .settings
        .model
        .clone()
        .unwrap_or_else(|| process_default.name.clone());
    let api_key = agent_api_key(&agent.settings.secrets, &provider).or_else(|| process_default.api_key.clone());
    let api_key_env = if api_key.is_some() {
        None
    } else {
        process_default.api_key_env.clone()
    };

    ModelConfig {
        provider,
        name,
        api_key_env,
        api_key,
        base_url: process_default.base_url.clone(),
        max_tokens: Some(agent.settings.max_tokens),
        temperature: Some(agent.settings.temperature),
        cache_system_prompt: process_default.cache_system_prompt,
        extended_cache_time: process_default.extended_cache_time,
        cache_tools: process_default.cache_tools,
        cache_conversation: process_default.cache_conversation,
        cache_images: process_default.cache_images,
        cache_tool_results: process_default.cache_tool_results,
        aws_region: process_default.aws_region.clone(),
        azure_deployment: process_default.azure_deployment.clone(),
        azure_resource: process_default.azure_resource.clone(),
        azure_api_version: process_default.azure_api_version.clone(),
        driver_options: process_default.driver_options.clone(),
        mock_responses_file: process_default.mock_responses_file.clone(),
    }
}

/// Builds the tool server endpoint set from an agent's enabled tool
/// bindings. Each bound [`iris_config::Tool`] carries its server URL in its
/// free-form `config.url` field.
pub fn build_endpoints(agent: &AgentConfig) -> Vec<ToolServerEndpoint> {
    agent
        .tools
        .iter()
        .flatten()
        .filter(|binding| binding.is_enabled)
        .filter_map(|binding| {
            let details = binding.tool_details.as_ref()?;
            let url = details.config.get("url")?.as_str()?;
            Some(ToolServerEndpoint::streamable_http(details.name.clone(), url.to_string()))
        })
        .collect()
}

/// Truncates a bot token to its first five characters for logging (§4.A
/// "Only the first five characters of any bot token appear in logs").
pub fn truncated_token(token: &str) -> String {
    token.chars().take(5).collect()
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn process_default() -> ModelConfig {
        ModelConfig {
            api_key: Some("process-key".into()),
            ..ModelConfig::default()
        }
    }

    fn base_agent() -> AgentConfig {
        serde_json::from_value(json!({
            "name": "a",
            "modelProvider": "anthropic",
            "settings": {"maxTokens": 1024, "temperature": 0.3},
        }))
        .unwrap()
    }

    #[test]
    fn agent_secret_overrides_process_default() {
        let mut agent = base_agent();
        agent.settings.secrets.anthropic_api_key = Some("agent-key".into());
        let cfg = build_model_config(&agent, &process_default());
        assert_eq!(cfg.api_key.as_deref(), Some("agent-key"));
    }

    #[test]
    fn falls_back_to_process_default_key_when_agent_has_none() {
        let agent = base_agent();
        let cfg = build_model_config(&agent, &process_default());
        assert_eq!(cfg.api_key.as_deref(), Some("process-key"));
    }

    #[test]
    fn agent_settings_override_tokens_and_temperature() {
        let agent = base_agent();
        let cfg = build_model_config(&agent, &process_default());
        assert_eq!(cfg.max_tokens, Some(1024));
        assert_eq!(cfg.temperature, Some(0.3));
    }

    #[test]
    fn build_endpoints_skips_disabled_and_urlless_bindings() {
        let mut agent = base_agent();
        agent.tools = Some(vec![
            iris_config::AgentToolBinding {
                tool_id: Some("t1".into()),
                is_enabled: true,
                tool_details: Some(iris_config::Tool {
                    id: Some("t1".into()),
                    name: "news".into(),
                    description: None,
                    config: json!({"url": "http://news.local"}),
                }),
            },
            iris_config::AgentToolBinding {
                tool_id: Some("t2".into()),
                is_enabled: false,
                tool_details: Some(iris_config::Tool {
                    id: Some("t2".into()),
                    name: "disabled".into(),
                    description: None,
                    config: json!({"url": "http://disabled.local"}),
                }),
            },
        ]);
        let endpoints = build_endpoints(&agent);
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].id, "news");
    }

    #[test]
    fn truncated_token_keeps_first_five_chars() {
        assert_eq!(truncated_token("abcdefgh"), "abcde");
        assert_eq!(truncated_token("ab"), "ab");
    }
}
