//! Multi-provider chat-client abstraction
//!
//! Exactly one provider is active per run, selected by `[ai].provider` in the
//! config. [`resolve`] validates the active provider's settings and returns a
//! ready client behind the uniform [`ChatClient`] contract; [`describe`]
//! renders the same selection as a display label. Resolution touches only
//! configuration; connections are lazy.

pub mod ollama;
pub mod openai;
pub mod stream;
pub mod types;
mod wire;

use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::config::Config;

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
pub use stream::{TokenStream, cancellable};
pub use types::{
    ChatBlock, ChatClient, ChatMessage, ChatOptions, ChatReply, ChatRequest, ChatRole,
    MessageContent, ReplyBlock, StopReason, TokenUsage, ToolDefinition,
};

/// Model used for the OpenAI path when `openai.model` is unset.
/// The Ollama path has no model default; see [`resolve`].
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Supported chat backends, selected once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    Ollama,
}

impl Provider {
    /// Display casing for labels
    pub fn label(&self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Ollama => "Ollama",
        }
    }
}

impl FromStr for Provider {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            _ => Err(ResolveError::UnsupportedProvider(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("missing required setting `{0}`")]
    MissingSetting(&'static str),

    #[error("invalid `ollama.endpoint` \"{value}\": {source}")]
    InvalidEndpoint {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported provider \"{0}\" (expected \"openai\" or \"ollama\")")]
    UnsupportedProvider(String),
}

/// The provider selector from config: case-insensitive, defaulting to the
/// OpenAI path when absent or empty.
fn active_provider(config: &Config) -> Result<Provider, ResolveError> {
    match config.ai.provider.as_deref() {
        None | Some("") => Ok(Provider::OpenAi),
        Some(name) => name.parse(),
    }
}

/// Resolve the active provider's settings into a ready chat client.
///
/// Each provider path validates its own required settings and fails with an
/// error naming the missing key. No network I/O happens here.
pub fn resolve(config: &Config) -> Result<Box<dyn ChatClient>, ResolveError> {
    match active_provider(config)? {
        Provider::OpenAi => {
            let api_key = config
                .openai
                .as_ref()
                .and_then(|o| o.api_key.as_deref())
                .filter(|k| !k.is_empty())
                .ok_or(ResolveError::MissingSetting("openai.api_key"))?;
            let model = config
                .openai
                .as_ref()
                .and_then(|o| o.model.clone())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());

            let mut client = OpenAiClient::new(api_key.to_string(), model);
            if let Some(base_url) = config.openai.as_ref().and_then(|o| o.base_url.clone()) {
                client = client.with_base_url(base_url);
            }
            Ok(Box::new(client))
        }
        Provider::Ollama => {
            let endpoint = config
                .ollama
                .as_ref()
                .and_then(|o| o.endpoint.as_deref())
                .filter(|e| !e.is_empty())
                .ok_or(ResolveError::MissingSetting("ollama.endpoint"))?;
            let endpoint = Url::parse(endpoint).map_err(|source| ResolveError::InvalidEndpoint {
                value: endpoint.to_string(),
                source,
            })?;
            let model = config
                .ollama
                .as_ref()
                .and_then(|o| o.model.clone())
                .filter(|m| !m.is_empty())
                .ok_or(ResolveError::MissingSetting("ollama.model"))?;

            Ok(Box::new(OllamaClient::new(endpoint, model)))
        }
    }
}

/// Human-readable "Provider (model)" label for console display, using the
/// same fallback rules as [`resolve`]. Purely derived: never fails, has no
/// side effects, and fields that resolution would reject render as placeholders.
pub fn describe(config: &Config) -> String {
    match active_provider(config) {
        Ok(provider @ Provider::OpenAi) => {
            let model = config
                .openai
                .as_ref()
                .and_then(|o| o.model.clone())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
            format!("{} ({})", provider.label(), model)
        }
        Ok(provider @ Provider::Ollama) => {
            let model = config
                .ollama
                .as_ref()
                .and_then(|o| o.model.clone())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "unset".to_string());
            format!("{} ({})", provider.label(), model)
        }
        Err(_) => {
            let name = config.ai.provider.clone().unwrap_or_default();
            format!("{} (unsupported)", name)
        }
    }
}
