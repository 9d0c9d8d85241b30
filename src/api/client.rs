use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;

use crate::api::models::{ChatFragment, ChatRequest};
use crate::api::streaming::parse_chat_stream;
use crate::error::{Result, VoxChatError};
use crate::models::Message;

/// Streaming inference seam. The orchestrator only sees fragments, so tests
/// can script a backend without a live model server.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn stream_chat(
        &self,
        messages: &[Message],
        tools: &[Value],
    ) -> Result<BoxStream<'static, Result<ChatFragment>>>;
}

/// Ollama-compatible `/api/chat` client.
pub struct OllamaClient {
    endpoint: String,
    model: String,
    stream_timeout: u64,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(endpoint: &str, model: &str, stream_timeout: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            stream_timeout,
            http,
        })
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.endpoint)
    }
}

#[async_trait]
impl ChatBackend for OllamaClient {
    async fn stream_chat(
        &self,
        messages: &[Message],
        tools: &[Value],
    ) -> Result<BoxStream<'static, Result<ChatFragment>>> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: messages.to_vec(),
            stream: true,
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.to_vec())
            },
        };

        let response = self.http.post(self.chat_url()).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VoxChatError::ApiError { status, message });
        }

        Ok(parse_chat_stream(response, self.stream_timeout).boxed())
    }
}
