// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! Tool-output truncation.
//!
//! Applied to every tool result before it is appended to conversation
//! history, so that a single verbose tool call cannot blow the context
//! budget. Dispatch is keyed off the *shape* of the parsed content rather
//! than the name of the tool that produced it — a JSON object with an
//! `articles` array is summarised into headlines, one with a `data` dict of
//! `symbol -> {current_price, ...}` is rendered as a quote list, and
//! anything else falls through to generic truncation. No tool declares
//! its output shape; this module stays independent of any concrete tool
//! list.

use serde_json::Value;

use crate::MAX_TOOL_OUTPUT_CHARS;

const MAX_HEADLINES: usize = 5;
const JSON_HEAD_TAIL_CHARS: usize = 750;

/// Summarise a raw tool result if its parsed content matches a known shape,
/// otherwise fall back to plain character-budget truncation.
pub fn truncate_tool_output(raw: &str) -> String {
    summarise_articles(raw)
        .or_else(|| summarise_quotes(raw))
        .unwrap_or_else(|| generic_truncate(raw))
}

fn summarise_articles(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let articles = value.get("articles")?.as_array()?;
    let count = articles.len();
    let headlines: Vec<String> = articles
        .iter()
        .take(MAX_HEADLINES)
        .filter_map(|a| {
            a.get("title")
                .and_then(Value::as_str)
                .map(|s| s.to_string())
        })
        .collect();
    if headlines.is_empty() && count > 0 {
        return Some(format!("Found {count} news articles."));
    }
    Some(format!(
        "Found {count} news articles. Top headlines: {}",
        headlines.join("; ")
    ))
}

fn summarise_quotes(raw: &str) -> Option<String> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let data = value.get("data")?.as_object()?;
    let mut parts = Vec::with_capacity(data.len());
    for (symbol, quote) in data {
        let price = quote.get("current_price")?;
        parts.push(format!("{symbol}: {price}"));
    }
    parts.sort();
    Some(parts.join(", "))
}

/// Plain-text / generic truncation: exact prefix cut at
/// [`MAX_TOOL_OUTPUT_CHARS`], with a head/tail rendering for JSON payloads.
fn generic_truncate(raw: &str) -> String {
    if raw.chars().count() <= MAX_TOOL_OUTPUT_CHARS {
        return raw.to_string();
    }
    if serde_json::from_str::<Value>(raw).is_ok() {
        let chars: Vec<char> = raw.chars().collect();
        let head: String = chars.iter().take(JSON_HEAD_TAIL_CHARS).collect();
        let tail: String = chars[chars.len().saturating_sub(JSON_HEAD_TAIL_CHARS)..]
            .iter()
            .collect();
        format!("Large JSON output (truncated): {head}…{tail}")
    } else {
        let prefix: String = raw.chars().take(MAX_TOOL_OUTPUT_CHARS).collect();
        format!("{prefix}… (truncated)")
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
