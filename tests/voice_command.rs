use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use voxchat::error::{Result, VoxChatError};
use voxchat::mcp::{McpTool, McpToolResult, ToolContent, ToolGateway};
use voxchat::voice::{correct_command, Speaker, CORRECTION_TOOL, NOT_RECOGNIZED};

enum Outcome {
    Text(&'static str),
    NoContent,
    SessionFailure(&'static str),
}

struct FixedGateway {
    outcome: Outcome,
    last_call: Mutex<Option<(String, Value)>>,
}

impl FixedGateway {
    fn new(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            last_call: Mutex::new(None),
        })
    }
}

#[async_trait]
impl ToolGateway for FixedGateway {
    async fn list_tools(&self) -> Result<Vec<McpTool>> {
        Ok(vec![])
    }

    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<McpToolResult> {
        *self.last_call.lock().unwrap() = Some((name.to_string(), arguments.clone()));
        match self.outcome {
            Outcome::Text(text) => Ok(McpToolResult {
                content: vec![ToolContent {
                    content_type: "text".to_string(),
                    text: Some(text.to_string()),
                }],
                is_error: None,
            }),
            Outcome::NoContent => Ok(McpToolResult {
                content: vec![],
                is_error: None,
            }),
            Outcome::SessionFailure(msg) => Err(VoxChatError::Connection(msg.to_string())),
        }
    }
}

#[derive(Clone)]
struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingSpeaker {
    fn new() -> Self {
        Self {
            spoken: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl Speaker for RecordingSpeaker {
    fn speak(&self, text: &str) {
        self.spoken.lock().unwrap().push(text.to_string());
    }
}

#[tokio::test]
async fn correction_routes_through_the_fixed_tool() {
    let gateway = FixedGateway::new(Outcome::Text("CLICK home"));
    let speaker = RecordingSpeaker::new();

    let result = correct_command(gateway.as_ref(), &speaker, "click on home please").await;

    assert_eq!(result, "CLICK home");
    let (name, arguments) = gateway.last_call.lock().unwrap().clone().unwrap();
    assert_eq!(name, CORRECTION_TOOL);
    assert_eq!(arguments["query"], "click on home please");
}

#[tokio::test]
async fn corrected_command_is_spoken() {
    let gateway = FixedGateway::new(Outcome::Text("OPEN calculator"));
    let speaker = RecordingSpeaker::new();

    correct_command(gateway.as_ref(), &speaker, "open the calculator").await;

    assert_eq!(speaker.spoken(), vec!["OPEN calculator".to_string()]);
}

#[tokio::test]
async fn spoken_command_is_cleaned_of_turn_markers() {
    let gateway = FixedGateway::new(Outcome::Text("  <start_of_turn>CLICK home<end_of_turn> "));
    let speaker = RecordingSpeaker::new();

    let result = correct_command(gateway.as_ref(), &speaker, "click home").await;

    // The returned command is verbatim; only the spoken copy is cleaned.
    assert_eq!(result, "  <start_of_turn>CLICK home<end_of_turn> ");
    assert_eq!(speaker.spoken(), vec!["CLICK home".to_string()]);
}

#[tokio::test]
async fn empty_result_yields_sentinel_and_no_speech() {
    let gateway = FixedGateway::new(Outcome::NoContent);
    let speaker = RecordingSpeaker::new();

    let result = correct_command(gateway.as_ref(), &speaker, "mumble").await;

    assert_eq!(result, NOT_RECOGNIZED);
    assert!(speaker.spoken().is_empty());
}

#[tokio::test]
async fn session_failure_yields_error_string_and_no_speech() {
    let gateway = FixedGateway::new(Outcome::SessionFailure("connection refused"));
    let speaker = RecordingSpeaker::new();

    let result = correct_command(gateway.as_ref(), &speaker, "click home").await;

    assert!(result.starts_with("Error processing voice command:"));
    assert!(result.contains("connection refused"));
    assert!(speaker.spoken().is_empty());
}
