//! Ollama chat client (local server, OpenAI-compatible endpoint)

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::stream::{TokenStream, sse_token_stream};
use super::types::{ChatClient, ChatReply, ChatRequest};
use super::wire;

/// Chat client for a locally-running Ollama server. Ollama exposes the same
/// `/v1/chat/completions` surface as OpenAI; no authentication is required.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("client", &"<reqwest::Client>")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}

impl OllamaClient {
    /// Create a new client against a validated endpoint URL.
    /// No network I/O happens until the first request.
    pub fn new(endpoint: Url, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        // Url renders with a trailing slash; strip it so path joins stay clean
        let endpoint = endpoint.as_str().trim_end_matches('/').to_string();

        Self {
            client,
            endpoint,
            model,
        }
    }

    async fn post_chat(&self, body: &serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}/v1/chat/completions", self.endpoint);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Ollama request failed with status {}: {}",
                status,
                error_text
            ));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let body = wire::request_body(&self.model, request, false)?;
        debug!(
            "Ollama request: model={}, messages={}",
            self.model,
            request.messages.len()
        );

        let response = self.post_chat(&body).await?;
        let wire_response: wire::WireResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        wire::from_wire_response(wire_response)
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<TokenStream> {
        let body = wire::request_body(&self.model, request, true)?;
        debug!("Ollama streaming request: model={}", self.model);

        let response = self.post_chat(&body).await?;
        Ok(sse_token_stream(response))
    }
}
