// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use async_trait::async_trait;
use serde_json::Value;

/// A single tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    /// Opaque identifier returned by the model (forwarded verbatim)
    pub id: String,
    pub name: String,
    /// Parsed JSON arguments
    pub args: Value,
}

/// A single content item in a rich tool output.
///
/// Most tools produce only `Text`.  A federated tool backed by a vision
/// capable server may produce a mix of `Text` and `Image` items.
#[derive(Debug, Clone)]
pub enum ToolOutputPart {
    /// Plain UTF-8 text.
    Text(String),
    /// Base64 data URL: `data:<mime>;base64,<b64>`.
    Image(String),
}

/// Distinguishes why a tool execution failed, so `iris-core`'s `call_tool`
/// step knows whether to retry (`Transient`), record-and-move-on
/// (`Fatal`/`NotFound`), or treat the result as a success (`None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolErrorKind {
    #[default]
    None,
    /// No tool with this name is registered.
    NotFound,
    /// Likely to succeed on retry (timeout, rate limit, connection reset).
    Transient,
    /// Retrying would not help (bad arguments, permanent remote error).
    Fatal,
}

/// The result of executing a tool.
///
/// `content` is always the plain-text representation of the output (the
/// concatenation of all `Text` parts); `parts` carries the richer structure
/// for tools that return more than plain text.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub call_id: String,
    pub content: String,
    pub parts: Vec<ToolOutputPart>,
    /// If true, the tool execution failed non-fatally (returned error message).
    pub is_error: bool,
    pub error_kind: ToolErrorKind,
}

impl ToolOutput {
    /// Successful plain-text result.
    pub fn ok(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        let text = content.into();
        let call_id = call_id.into();
        Self {
            call_id,
            content: text.clone(),
            parts: vec![ToolOutputPart::Text(text)],
            is_error: false,
            error_kind: ToolErrorKind::None,
        }
    }

    /// Error result containing a plain-text error message. Defaults to
    /// `Fatal`; use [`ToolOutput::transient`] or [`ToolOutput::not_found`]
    /// for the other two error kinds.
    pub fn err(call_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::err_with_kind(call_id, msg, ToolErrorKind::Fatal)
    }

    /// Error that is likely to succeed if retried.
    pub fn transient(call_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::err_with_kind(call_id, msg, ToolErrorKind::Transient)
    }

    /// No tool registered under the requested name.
    pub fn not_found(call_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::err_with_kind(call_id, msg, ToolErrorKind::NotFound)
    }

    fn err_with_kind(call_id: impl Into<String>, msg: impl Into<String>, kind: ToolErrorKind) -> Self {
        let text = msg.into();
        let call_id = call_id.into();
        Self {
            call_id,
            content: text.clone(),
            parts: vec![ToolOutputPart::Text(text)],
            is_error: true,
            error_kind: kind,
        }
    }

    /// Result with arbitrary parts (text and/or images).
    ///
    /// `content` is set to the concatenation of all Text parts.
    pub fn with_parts(call_id: impl Into<String>, parts: Vec<ToolOutputPart>) -> Self {
        let text = parts
            .iter()
            .filter_map(|p| match p {
                ToolOutputPart::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            call_id: call_id.into(),
            content: text,
            parts,
            is_error: false,
            error_kind: ToolErrorKind::None,
        }
    }

    pub fn has_images(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p, ToolOutputPart::Image(_)))
    }
}

/// Trait every federated tool wrapper and local tool must implement.
///
/// Implementors are the leaves the Tool Federation Layer (`iris-federation`)
/// dispatches to: either a thin proxy over a remote MCP tool server, or a
/// credential-injection wrapper around one.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema for parameters
    fn parameters_schema(&self) -> Value;
    /// Execute the tool. Errors should be wrapped in [`ToolOutput::err`].
    async fn execute(&self, call: &ToolCall) -> ToolOutput;
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;

    struct MinimalTool;

    #[async_trait]
    impl Tool for MinimalTool {
        fn name(&self) -> &str {
            "minimal"
        }
        fn description(&self) -> &str {
            "a minimal tool"
        }
        fn parameters_schema(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn execute(&self, call: &ToolCall) -> ToolOutput {
            ToolOutput::ok(&call.id, "ok")
        }
    }

    #[tokio::test]
    async fn minimal_tool_executes_ok() {
        let call = ToolCall {
            id: "1".into(),
            name: "minimal".into(),
            args: json!({}),
        };
        let out = MinimalTool.execute(&call).await;
        assert!(!out.is_error);
    }

    #[test]
    fn tool_output_ok_sets_text_part() {
        let out = ToolOutput::ok("c1", "hello");
        assert!(!out.is_error);
        assert_eq!(out.content, "hello");
        assert!(!out.has_images());
    }

    #[test]
    fn tool_output_with_parts_joins_text() {
        let out = ToolOutput::with_parts(
            "c1",
            vec![
                ToolOutputPart::Text("a".into()),
                ToolOutputPart::Image("data:image/png;base64,AA==".into()),
                ToolOutputPart::Text("b".into()),
            ],
        );
        assert_eq!(out.content, "a\nb");
        assert!(out.has_images());
    }
}
