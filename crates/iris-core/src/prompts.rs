// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Effective system prompt composition.
//!
//! §3 of the spec fixes the order in which an agent's persona inputs are
//! folded into one system prompt: `system -> bio -> knowledge -> lore ->
//! style -> examples`. `iris_config::AgentConfig::compose_persona` already
//! handles the first four (system/bio/knowledge/lore — see that crate's
//! design note on why style/examples are handled here instead, since both
//! are free-form JSON rather than plain string lists); this module appends
//! the remaining two sections.

use iris_config::AgentConfig;
use serde_json::Value;

/// Build the complete system prompt for one agent turn.
pub fn compose_system_prompt(cfg: &AgentConfig) -> String {
    let mut sections = vec![cfg.compose_persona()];

    if let Some(style) = cfg.style.as_ref().and_then(render_style) {
        sections.push(style);
    }
    if let Some(examples) = cfg.message_examples.as_ref().and_then(render_examples) {
        sections.push(examples);
    }

    sections
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `style` may be a plain string or a `{category: [rules]}` map.
fn render_style(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => {
            let mut lines = vec!["## Style".to_string()];
            for (category, rules) in map {
                if let Some(arr) = rules.as_array() {
                    lines.push(format!("### {category}"));
                    for rule in arr {
                        if let Some(text) = rule.as_str() {
                            lines.push(format!("- {text}"));
                        }
                    }
                }
            }
            (lines.len() > 1).then(|| lines.join("\n"))
        }
        Value::Array(arr) => {
            let rules: Vec<&str> = arr.iter().filter_map(Value::as_str).collect();
            (!rules.is_empty()).then(|| {
                let mut lines = vec!["## Style".to_string()];
                lines.extend(rules.iter().map(|r| format!("- {r}")));
                lines.join("\n")
            })
        }
        _ => None,
    }
}

/// `message_examples` may be a flat list of `{user, assistant}` pairs or a
/// nested list of conversation turns; both shapes are rendered as a single
/// "## Example conversations" block.
fn render_examples(value: &Value) -> Option<String> {
    let examples = value.as_array()?;
    if examples.is_empty() {
        return None;
    }
    let mut lines = vec!["## Example conversations".to_string()];
    for (i, example) in examples.iter().enumerate() {
        lines.push(format!("### Example {}", i + 1));
        render_example_turns(example, &mut lines);
    }
    Some(lines.join("\n"))
}

fn render_example_turns(example: &Value, lines: &mut Vec<String>) {
    match example {
        Value::Array(turns) => {
            for turn in turns {
                render_turn(turn, lines);
            }
        }
        Value::Object(_) => render_turn(example, lines),
        _ => {}
    }
}

fn render_turn(turn: &Value, lines: &mut Vec<String>) {
    let role = turn
        .get("role")
        .or_else(|| turn.get("user"))
        .and_then(Value::as_str)
        .unwrap_or("user");
    let content = turn
        .get("content")
        .or_else(|| turn.get("text"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    if !content.is_empty() {
        lines.push(format!("{role}: {content}"));
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_config() -> AgentConfig {
        serde_json::from_value(json!({
            "name": "iris",
            "modelProvider": "anthropic",
            "settings": {},
            "system": "You are Iris, a helpful assistant.",
            "bio": ["Warm", "Direct"],
        }))
        .unwrap()
    }

    #[test]
    fn composes_system_and_bio_in_order() {
        let cfg = base_config();
        let prompt = compose_system_prompt(&cfg);
        let sys_pos = prompt.find("You are Iris").unwrap();
        let bio_pos = prompt.find("Warm").unwrap();
        assert!(sys_pos < bio_pos);
    }

    #[test]
    fn appends_style_string_after_persona() {
        let mut cfg = base_config();
        cfg.style = Some(json!("Always answer in haiku."));
        let prompt = compose_system_prompt(&cfg);
        let bio_pos = prompt.find("Warm").unwrap();
        let style_pos = prompt.find("haiku").unwrap();
        assert!(bio_pos < style_pos);
    }

    #[test]
    fn appends_structured_style_categories() {
        let mut cfg = base_config();
        cfg.style = Some(json!({ "chat": ["Use short sentences."] }));
        let prompt = compose_system_prompt(&cfg);
        assert!(prompt.contains("## Style"));
        assert!(prompt.contains("### chat"));
        assert!(prompt.contains("Use short sentences."));
    }

    #[test]
    fn appends_examples_after_style() {
        let mut cfg = base_config();
        cfg.style = Some(json!("Be brief."));
        cfg.message_examples = Some(json!([
            [{"role": "user", "content": "Hi"}, {"role": "agent", "content": "Hello!"}]
        ]));
        let prompt = compose_system_prompt(&cfg);
        let style_pos = prompt.find("Be brief.").unwrap();
        let examples_pos = prompt.find("## Example conversations").unwrap();
        assert!(style_pos < examples_pos);
        assert!(prompt.contains("user: Hi"));
        assert!(prompt.contains("agent: Hello!"));
    }

    #[test]
    fn absent_style_and_examples_produce_no_extra_sections() {
        let cfg = base_config();
        let prompt = compose_system_prompt(&cfg);
        assert!(!prompt.contains("## Style"));
        assert!(!prompt.contains("## Example conversations"));
    }
}
