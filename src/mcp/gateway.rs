use async_trait::async_trait;
use serde_json::Value;

use super::session::McpSession;
use super::types::{McpTool, McpToolResult};
use crate::error::Result;

/// Tool gateway seam. Implementations are stateless across calls: each
/// operation owns its own transport session.
#[async_trait]
pub trait ToolGateway: Send + Sync {
    async fn list_tools(&self) -> Result<Vec<McpTool>>;
    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<McpToolResult>;
}

/// Streamable HTTP gateway client. Every operation runs connect → initialize
/// → invoke → disconnect; the session is torn down on all exit paths before
/// the result is returned.
pub struct HttpGateway {
    url: String,
    timeout_secs: u64,
}

impl HttpGateway {
    pub fn new(url: &str, timeout_secs: u64) -> Self {
        Self {
            url: url.to_string(),
            timeout_secs,
        }
    }
}

#[async_trait]
impl ToolGateway for HttpGateway {
    async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let mut session = McpSession::connect(&self.url, self.timeout_secs).await?;
        let result = session.list_tools().await;
        session.close().await;
        Ok(result?.tools)
    }

    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<McpToolResult> {
        let mut session = McpSession::connect(&self.url, self.timeout_secs).await?;
        let result = session.call_tool(name, arguments).await;
        session.close().await;
        result
    }
}
