use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};
use tokio::time::Duration;

use super::types::{InitializeResult, McpToolResult, ToolListResponse};
use crate::error::{Result, VoxChatError};

// MCP protocol constants
const MCP_PROTOCOL_VERSION: &str = "2025-03-26";
const CLIENT_NAME: &str = "voxchat";
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");
const HEADER_SESSION_ID: &str = "Mcp-Session-Id";

/// One short-lived streamable HTTP session against the tool gateway.
///
/// JSON-RPC requests are POSTed to a single endpoint; the server answers with
/// a JSON body or a single-shot SSE body, and correlates follow-up requests
/// through the `Mcp-Session-Id` header handed out during `initialize`.
/// Sessions are not pooled: callers connect, perform one operation, and tear
/// the session down again.
pub struct McpSession {
    url: String,
    http: reqwest::Client,
    session_id: Option<String>,
    next_id: u64,
}

impl McpSession {
    /// Open a session: HTTP client, `initialize` handshake, `initialized`
    /// notification.
    pub async fn connect(url: &str, timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let mut session = Self {
            url: url.to_string(),
            http,
            session_id: None,
            next_id: 1,
        };

        let init_params = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "clientInfo": {
                "name": CLIENT_NAME,
                "version": CLIENT_VERSION
            }
        });

        let result = session
            .send_request("initialize", Some(init_params))
            .await
            .map_err(|e| VoxChatError::Connection(e.to_string()))?;
        let _init: InitializeResult = serde_json::from_value(result)
            .map_err(|e| VoxChatError::Connection(format!("bad initialize result: {}", e)))?;

        session
            .send_notification("notifications/initialized", None)
            .await?;

        Ok(session)
    }

    pub async fn list_tools(&mut self) -> Result<ToolListResponse> {
        let result = self.send_request("tools/list", None).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn call_tool(&mut self, name: &str, arguments: &Value) -> Result<McpToolResult> {
        let params = json!({
            "name": name,
            "arguments": arguments,
        });
        let result = self.send_request("tools/call", Some(params)).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Tear the session down. Best effort: a gateway that does not support
    /// explicit teardown simply lets the session expire.
    pub async fn close(&mut self) {
        if let Some(session_id) = self.session_id.take() {
            let _ = self
                .http
                .delete(&self.url)
                .header(HEADER_SESSION_ID, session_id)
                .send()
                .await;
        }
    }

    async fn send_request(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params.unwrap_or(json!({}))
        });

        let mut builder = self
            .http
            .post(&self.url)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&request);
        if let Some(ref session_id) = self.session_id {
            builder = builder.header(HEADER_SESSION_ID, session_id.as_str());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VoxChatError::Gateway(format!(
                "{} returned status {}: {}",
                method, status, message
            )));
        }

        if let Some(session_id) = response
            .headers()
            .get(HEADER_SESSION_ID)
            .and_then(|v| v.to_str().ok())
        {
            self.session_id = Some(session_id.to_string());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.text().await?;

        let envelope = if content_type.starts_with("text/event-stream") {
            extract_sse_response(&body, id)?
        } else {
            serde_json::from_str::<Value>(&body).map_err(|e| {
                VoxChatError::Gateway(format!("{}: non-JSON response body: {}", method, e))
            })?
        };

        if let Some(error) = envelope.get("error") {
            return Err(VoxChatError::Gateway(format!("{} failed: {}", method, error)));
        }

        envelope
            .get("result")
            .cloned()
            .ok_or_else(|| VoxChatError::Gateway(format!("{}: response carried no result", method)))
    }

    /// Fire-and-forget notification (no `id`, no response body expected).
    /// Servers answer these with 200/202 and an empty body.
    async fn send_notification(&mut self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params.unwrap_or(json!({}))
        });

        let mut builder = self
            .http
            .post(&self.url)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&notification);
        if let Some(ref session_id) = self.session_id {
            builder = builder.header(HEADER_SESSION_ID, session_id.as_str());
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            return Err(VoxChatError::Gateway(format!(
                "{} returned status {}",
                method,
                response.status()
            )));
        }

        Ok(())
    }
}

/// Pull the JSON-RPC response matching `id` out of a single-shot SSE body.
fn extract_sse_response(body: &str, id: u64) -> Result<Value> {
    for line in body.lines() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        if let Some(colon_pos) = line.find(':') {
            let field = line[..colon_pos].trim();
            let value = line[colon_pos + 1..].trim_start();

            if field != "data" {
                continue;
            }

            if let Ok(message) = serde_json::from_str::<Value>(value) {
                if message.get("id") == Some(&json!(id)) {
                    return Ok(message);
                }
            }
        }
    }

    Err(VoxChatError::Gateway(format!(
        "no response for request {} in event stream",
        id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_body_yields_matching_response() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{\"ok\":true}}\n\n";
        let response = extract_sse_response(body, 1).unwrap();
        assert_eq!(response["result"]["ok"], true);
    }

    #[test]
    fn sse_body_skips_other_ids_and_comments() {
        let body = ": keep-alive\ndata: {\"jsonrpc\":\"2.0\",\"id\":7,\"result\":{}}\ndata: {\"jsonrpc\":\"2.0\",\"id\":2,\"result\":{\"tools\":[]}}\n";
        let response = extract_sse_response(body, 2).unwrap();
        assert!(response["result"]["tools"].as_array().unwrap().is_empty());
    }

    #[test]
    fn sse_body_without_match_is_an_error() {
        assert!(extract_sse_response("data: {\"id\":9}\n", 1).is_err());
    }
}
