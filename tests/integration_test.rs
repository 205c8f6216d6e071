// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
//! End-to-end exercise of the Agent Runtime's turn loop against the mock
//! model providers, independent of any HTTP edge or persistence.

use std::sync::Arc;

use async_trait::async_trait;
use iris_core::{Agent, RuntimeEvent, TurnOutcome};
use iris_model::{Message, MockProvider, ScriptedMockProvider};
use iris_tools::{Tool, ToolCall, ToolOutput, ToolRegistry};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes its input back."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"],
        })
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutput {
        let text = call.args.get("text").and_then(|v| v.as_str()).unwrap_or_default();
        ToolOutput::ok(&call.id, format!("echoed: {text}"))
    }
}

async fn drain_text(rx: &mut mpsc::Receiver<RuntimeEvent>) -> String {
    let mut out = String::new();
    while let Ok(event) = rx.try_recv() {
        if let RuntimeEvent::TextDelta(delta) = event {
            out.push_str(&delta);
        }
    }
    out
}

#[tokio::test]
async fn plain_text_turn_returns_mock_reply() {
    let agent = Agent::new(Arc::new(MockProvider), Arc::new(ToolRegistry::default()), "you are helpful".into());
    let (tx, mut rx) = mpsc::channel(64);

    let outcome = agent
        .run_turn(&[], Message::user("hello"), tx, CancellationToken::new())
        .await
        .unwrap();

    match outcome {
        TurnOutcome::Final(text) => assert!(text.contains("MOCK: hello")),
        TurnOutcome::Cancelled => panic!("turn should not have been cancelled"),
    }
    assert!(drain_text(&mut rx).contains("MOCK: hello"));
}

#[tokio::test]
async fn tool_call_round_trip_reaches_final_text() {
    let mut registry = ToolRegistry::default();
    registry.register(EchoTool);

    let provider = ScriptedMockProvider::tool_then_text("call-1", "echo", r#"{"text":"hi"}"#, "all done");
    let agent = Agent::new(Arc::new(provider), Arc::new(registry), "you are helpful".into());
    let (tx, mut rx) = mpsc::channel(64);

    let outcome = agent
        .run_turn(&[], Message::user("please echo hi"), tx, CancellationToken::new())
        .await
        .unwrap();

    match outcome {
        TurnOutcome::Final(text) => assert_eq!(text, "all done"),
        TurnOutcome::Cancelled => panic!("turn should not have been cancelled"),
    }

    let mut saw_tool_started = false;
    let mut saw_tool_finished = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            RuntimeEvent::ToolCallStarted(call) => {
                assert_eq!(call.name, "echo");
                saw_tool_started = true;
            }
            RuntimeEvent::ToolCallFinished { tool_name, output, is_error, .. } => {
                assert_eq!(tool_name, "echo");
                assert!(!is_error);
                assert!(output.contains("echoed: hi"));
                saw_tool_finished = true;
            }
            _ => {}
        }
    }
    assert!(saw_tool_started, "expected a ToolCallStarted event");
    assert!(saw_tool_finished, "expected a ToolCallFinished event");
}

#[tokio::test]
async fn unknown_tool_call_is_absorbed_not_fatal() {
    let provider = ScriptedMockProvider::tool_then_text("call-1", "does_not_exist", "{}", "recovered");
    let agent = Agent::new(Arc::new(provider), Arc::new(ToolRegistry::default()), "sys".into());
    let (tx, mut rx) = mpsc::channel(64);

    let outcome = agent
        .run_turn(&[], Message::user("go"), tx, CancellationToken::new())
        .await
        .unwrap();

    match outcome {
        TurnOutcome::Final(text) => assert_eq!(text, "recovered"),
        TurnOutcome::Cancelled => panic!("turn should not have been cancelled"),
    }
    assert!(matches!(
        rx.try_recv(),
        Ok(RuntimeEvent::ToolCallStarted(_)) | Ok(RuntimeEvent::ToolCallFinished { .. })
    ));
}

#[tokio::test]
async fn turn_honours_pre_cancelled_token() {
    let agent = Agent::new(Arc::new(MockProvider), Arc::new(ToolRegistry::default()), "sys".into());
    let (tx, _rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = agent.run_turn(&[], Message::user("hello"), tx, cancel).await.unwrap();
    assert!(matches!(outcome, TurnOutcome::Cancelled));
}

#[tokio::test]
async fn history_window_is_applied_before_the_new_turn() {
    let history: Vec<Message> = (0..20).map(|i| Message::user(format!("old-{i}"))).collect();
    let agent = Agent::new(Arc::new(MockProvider), Arc::new(ToolRegistry::default()), "sys".into());
    let (tx, _rx) = mpsc::channel(64);

    // MockProvider echoes the last user message it was handed, which after
    // windowing + the new message is the new message itself.
    let outcome = agent
        .run_turn(&history, Message::user("newest"), tx, CancellationToken::new())
        .await
        .unwrap();

    match outcome {
        TurnOutcome::Final(text) => assert!(text.contains("MOCK: newest")),
        TurnOutcome::Cancelled => panic!("turn should not have been cancelled"),
    }
}

#[test]
fn config_defaults_are_valid() {
    use iris_config::Config;

    let cfg = Config::default();
    assert_eq!(cfg.model.provider, "openai");
    assert_eq!(cfg.http.bind, "0.0.0.0:8443");
    assert!(cfg.store.database_url.starts_with("postgres://"));
}
