use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Advertised gateway capability, fetched once at connection time. The set is
/// immutable for the lifetime of a connected session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpTool {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl McpTool {
    /// Function-calling schema entry for the inference request.
    pub fn to_function_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description.as_deref().unwrap_or(""),
                "parameters": self.input_schema,
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpToolResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl McpToolResult {
    /// Text of the first content block, if the gateway produced any. A
    /// missing or empty text is a valid "no output" result, not a failure.
    pub fn first_text(&self) -> Option<&str> {
        self.content
            .first()
            .and_then(|c| c.text.as_deref())
            .filter(|t| !t.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolListResponse {
    pub tools: Vec<McpTool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_text_skips_empty_content() {
        let result = McpToolResult {
            content: vec![],
            is_error: None,
        };
        assert!(result.first_text().is_none());

        let result = McpToolResult {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text: Some(String::new()),
            }],
            is_error: None,
        };
        assert!(result.first_text().is_none());
    }

    #[test]
    fn first_text_returns_leading_block() {
        let result = McpToolResult {
            content: vec![
                ToolContent {
                    content_type: "text".to_string(),
                    text: Some("4".to_string()),
                },
                ToolContent {
                    content_type: "text".to_string(),
                    text: Some("ignored".to_string()),
                },
            ],
            is_error: None,
        };
        assert_eq!(result.first_text(), Some("4"));
    }

    #[test]
    fn function_schema_carries_parameters() {
        let tool = McpTool {
            name: "add".to_string(),
            description: Some("Add two numbers".to_string()),
            input_schema: json!({"type": "object", "properties": {"a": {"type": "number"}}}),
        };
        let schema = tool.to_function_schema();
        assert_eq!(schema["type"], "function");
        assert_eq!(schema["function"]["name"], "add");
        assert_eq!(schema["function"]["parameters"]["type"], "object");
    }
}
