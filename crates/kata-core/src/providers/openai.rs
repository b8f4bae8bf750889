//! OpenAI chat client (hosted API)

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::mask_secret;

use super::stream::{TokenStream, sse_token_stream};
use super::types::{ChatClient, ChatReply, ChatRequest};
use super::wire;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Chat client for the hosted OpenAI API
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_key", &mask_secret(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiClient {
    /// Create a new client. No network I/O happens until the first request.
    pub fn new(api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
        }
    }

    /// Point the client at a different endpoint root
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn post_chat(&self, body: &serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "OpenAI API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let body = wire::request_body(&self.model, request, false)?;
        debug!(
            "OpenAI request: model={}, messages={}",
            self.model,
            request.messages.len()
        );

        let response = self.post_chat(&body).await?;
        let wire_response: wire::WireResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        wire::from_wire_response(wire_response)
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<TokenStream> {
        let body = wire::request_body(&self.model, request, true)?;
        debug!("OpenAI streaming request: model={}", self.model);

        let response = self.post_chat(&body).await?;
        Ok(sse_token_stream(response))
    }
}
