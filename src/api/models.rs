use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Message, ToolCall};

#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,
}

/// One NDJSON line of an `/api/chat` streaming response.
#[derive(Deserialize)]
pub struct ChatChunk {
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct ChunkMessage {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// One incremental unit of a streamed inference response, carrying partial
/// text and/or tool-call requests.
#[derive(Debug, Clone, Default)]
pub struct ChatFragment {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub done: bool,
}
