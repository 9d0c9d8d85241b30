use std::sync::Arc;

use futures::StreamExt;
use jsonschema::JSONSchema;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::api::{ChatBackend, OllamaClient};
use crate::config::Config;
use crate::error::{Result, VoxChatError};
use crate::mcp::{HttpGateway, McpTool, ToolGateway};
use crate::models::{Message, ToolCall};
use crate::voice::{self, NullSpeaker, Speaker, SystemSpeaker};

pub const DEFAULT_MAX_TURNS: usize = 4;

/// Sentinel for a tool that ran but produced no extractable text. This is a
/// degenerate success, not a failure.
pub const NO_CONTENT_RESULT: &str = "Tool executed but returned no content.";

const FRAGMENT_CHANNEL_SIZE: usize = 32;

const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI assistant that can use tools exposed by a remote tool server.\n\n\
TOOL USAGE RULES:\n\
- Only call tools by their exact names from the provided tool list.\n\
- Do not invent tool names.\n\
- When you call a tool, provide valid arguments matching its schema.\n\
- After any tool result, explain the result clearly to the user.\n";

/// Owns the conversation history and drives the multi-turn tool loop.
///
/// One orchestration run mutates the history exclusively: `stream_response`
/// locks it for the duration of the spawned loop, so a caller draining one
/// response cannot race a second run against the same conversation.
pub struct Orchestrator {
    backend: Arc<dyn ChatBackend>,
    gateway: Arc<dyn ToolGateway>,
    speaker: Arc<dyn Speaker>,
    tools: Arc<Vec<McpTool>>,
    tool_schemas: Arc<Vec<Value>>,
    history: Arc<Mutex<Vec<Message>>>,
    system_prompt: String,
}

impl Orchestrator {
    /// Establish a connected session: fetch the advertised tool set once and
    /// seed the history with the single system message.
    pub async fn connect(config: &Config) -> Result<Self> {
        let backend = OllamaClient::new(
            &config.api_endpoint,
            &config.model,
            config.stream_timeout,
        )?;
        let gateway = HttpGateway::new(&config.gateway_url, config.gateway_timeout);

        let speaker: Arc<dyn Speaker> = if config.speech_enabled {
            Arc::new(SystemSpeaker::new(&config.speech_command))
        } else {
            Arc::new(NullSpeaker)
        };

        let base_prompt = config
            .system_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
        let system_prompt = format!("Today's date is {}.\n\n{}", Config::current_date(), base_prompt);

        Self::with_components(Arc::new(backend), Arc::new(gateway), speaker, &system_prompt).await
    }

    /// Wire the orchestrator from its collaborators. Connection is only
    /// considered established once the tool listing has succeeded.
    pub async fn with_components(
        backend: Arc<dyn ChatBackend>,
        gateway: Arc<dyn ToolGateway>,
        speaker: Arc<dyn Speaker>,
        system_prompt: &str,
    ) -> Result<Self> {
        let tools = gateway.list_tools().await.map_err(|e| match e {
            VoxChatError::Connection(_) => e,
            other => VoxChatError::Connection(other.to_string()),
        })?;
        let tool_schemas: Vec<Value> = tools.iter().map(McpTool::to_function_schema).collect();

        Ok(Self {
            backend,
            gateway,
            speaker,
            tools: Arc::new(tools),
            tool_schemas: Arc::new(tool_schemas),
            history: Arc::new(Mutex::new(vec![Message::system(system_prompt)])),
            system_prompt: system_prompt.to_string(),
        })
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub async fn history(&self) -> Vec<Message> {
        self.history.lock().await.clone()
    }

    /// Reset the conversation to the single system message.
    pub async fn reset_history(&self) {
        let mut history = self.history.lock().await;
        history.clear();
        history.push(Message::system(&self.system_prompt));
    }

    /// Speak arbitrary text through the gated speech sink.
    pub fn speak(&self, text: &str) {
        voice::speak_gated(self.speaker.as_ref(), text);
    }

    /// One-shot voice-command correction. Never fails: all failure states
    /// come back as announceable strings.
    pub async fn correct(&self, natural_command: &str) -> String {
        voice::correct_command(
            self.gateway.as_ref(),
            self.speaker.as_ref(),
            natural_command,
        )
        .await
    }

    /// Ask the model, streaming text fragments back lazily.
    ///
    /// The returned receiver always yields a complete sequence: tool
    /// failures appear as inline fragments and budget exhaustion as a
    /// terminal warning fragment, never as a dropped channel mid-answer.
    /// Dropping the receiver stops the loop at the next fragment or tool
    /// boundary.
    pub fn stream_response(&self, user_text: &str, max_turns: usize) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(FRAGMENT_CHANNEL_SIZE);

        let backend = Arc::clone(&self.backend);
        let gateway = Arc::clone(&self.gateway);
        let tools = Arc::clone(&self.tools);
        let schemas = Arc::clone(&self.tool_schemas);
        let history = Arc::clone(&self.history);
        let user_text = user_text.to_string();
        let max_turns = max_turns.max(1);

        tokio::spawn(async move {
            let mut history = history.lock().await;
            run_turn_loop(
                backend.as_ref(),
                gateway.as_ref(),
                &tools,
                &schemas,
                &mut history,
                &user_text,
                max_turns,
                &tx,
            )
            .await;
        });

        rx
    }
}

/// The orchestration loop. Each iteration is one turn: an inference
/// round-trip, tool execution for any calls it issued, and the follow-up
/// explanation round-trip.
#[allow(clippy::too_many_arguments)]
async fn run_turn_loop(
    backend: &dyn ChatBackend,
    gateway: &dyn ToolGateway,
    tools: &[McpTool],
    schemas: &[Value],
    history: &mut Vec<Message>,
    user_text: &str,
    max_turns: usize,
    out: &mpsc::Sender<String>,
) {
    history.push(Message::user(user_text));

    for _ in 0..max_turns {
        let (assistant_text, pending_calls) = match stream_round(backend, history, schemas, out).await
        {
            Ok(round) => round,
            Err(e) => {
                let _ = out.send(format!("\nError: {}\n", e)).await;
                return;
            }
        };
        history.push(Message::assistant(assistant_text, pending_calls.clone()));

        if pending_calls.is_empty() {
            // This turn's assistant message is the final answer.
            return;
        }
        if out.is_closed() {
            return;
        }

        let _ = out
            .send(format!("\n\nExecuting {} tool(s)...\n\n", pending_calls.len()))
            .await;

        // Strictly in issuance order; each result lands in history before
        // the next call runs.
        for call in &pending_calls {
            if out.is_closed() {
                return;
            }
            let _ = out.send(format!("Running: {}\n", call.function.name)).await;

            match execute_tool(gateway, tools, call).await {
                Ok(raw) => {
                    history.push(Message::tool(
                        Uuid::new_v4().to_string(),
                        explain_prompt(&call.function.name, &raw),
                    ));
                }
                Err(e) => {
                    // A single failure does not abort the turn. The model
                    // still gets a stand-in result so the follow-up can
                    // address it.
                    let _ = out.send(format!("Tool error: {}\n", e)).await;
                    history.push(Message::tool(
                        Uuid::new_v4().to_string(),
                        failure_prompt(&call.function.name, &e),
                    ));
                }
            }
        }

        // Follow-up explanation over the updated history. Tool calls it
        // carries are accumulated explicitly and decide whether another
        // turn runs.
        let (followup_text, followup_calls) = match stream_round(backend, history, schemas, out).await
        {
            Ok(round) => round,
            Err(e) => {
                let _ = out.send(format!("\nError: {}\n", e)).await;
                return;
            }
        };
        history.push(Message::assistant(followup_text, followup_calls.clone()));

        if followup_calls.is_empty() {
            return;
        }
    }

    let _ = out
        .send("\n\nWarning: step budget exceeded; stopping before a final answer.\n".to_string())
        .await;
}

/// One inference round-trip: forward text fragments as they arrive while
/// accumulating the full text and any tool-call requests.
async fn stream_round(
    backend: &dyn ChatBackend,
    history: &[Message],
    schemas: &[Value],
    out: &mpsc::Sender<String>,
) -> Result<(String, Vec<ToolCall>)> {
    let mut stream = backend.stream_chat(history, schemas).await?;

    let mut text = String::new();
    let mut calls: Vec<ToolCall> = Vec::new();

    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;

        if let Some(content) = fragment.text {
            text.push_str(&content);
            if out.send(content).await.is_err() {
                // Receiver dropped; keep what accumulated so far.
                break;
            }
        }
        calls.extend(fragment.tool_calls);

        if fragment.done {
            break;
        }
    }

    Ok((text, calls))
}

/// Tool execution adapter: validate against the advertised schema, then run
/// one independent gateway session for this call.
async fn execute_tool(
    gateway: &dyn ToolGateway,
    tools: &[McpTool],
    call: &ToolCall,
) -> Result<String> {
    let name = &call.function.name;

    let tool = tools.iter().find(|t| t.name == *name).ok_or_else(|| {
        VoxChatError::ToolExecution(format!("tool '{}' is not advertised by the gateway", name))
    })?;
    validate_arguments(tool, &call.function.arguments)?;

    let result = gateway
        .call_tool(name, &call.function.arguments)
        .await
        .map_err(|e| VoxChatError::ToolExecution(e.to_string()))?;

    Ok(result.first_text().unwrap_or(NO_CONTENT_RESULT).to_string())
}

fn validate_arguments(tool: &McpTool, arguments: &Value) -> Result<()> {
    let schema = JSONSchema::compile(&tool.input_schema).map_err(|e| {
        VoxChatError::ToolExecution(format!("invalid schema for tool '{}': {}", tool.name, e))
    })?;

    if let Err(errors) = schema.validate(arguments) {
        let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
        return Err(VoxChatError::ToolExecution(format!(
            "arguments for tool '{}' rejected: {}",
            tool.name,
            messages.join("; ")
        )));
    }

    Ok(())
}

/// Instructional wrapper around a raw tool result, asking the model to turn
/// it into a user-facing explanation.
fn explain_prompt(name: &str, raw: &str) -> String {
    format!(
        "The tool '{}' has finished executing.\nRaw output:\n{}\n\nNow explain this result to the user in a clear, human-readable way.",
        name, raw
    )
}

fn failure_prompt(name: &str, error: &VoxChatError) -> String {
    format!(
        "The tool '{}' failed to execute.\nError:\n{}\n\nAcknowledge the failure and explain it to the user.",
        name, error
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn explain_prompt_carries_name_and_output() {
        let prompt = explain_prompt("add", "4");
        assert!(prompt.contains("'add'"));
        assert!(prompt.contains("Raw output:\n4"));
        assert!(prompt.contains("explain this result"));
    }

    #[test]
    fn validate_arguments_accepts_matching_object() {
        let tool = McpTool {
            name: "add".to_string(),
            description: None,
            input_schema: json!({
                "type": "object",
                "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                "required": ["a", "b"]
            }),
        };
        assert!(validate_arguments(&tool, &json!({"a": 2, "b": 2})).is_ok());
    }

    #[test]
    fn validate_arguments_rejects_missing_required() {
        let tool = McpTool {
            name: "add".to_string(),
            description: None,
            input_schema: json!({
                "type": "object",
                "properties": {"a": {"type": "number"}},
                "required": ["a"]
            }),
        };
        let err = validate_arguments(&tool, &json!({})).unwrap_err();
        assert!(err.to_string().contains("add"));
    }
}
