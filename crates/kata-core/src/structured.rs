//! Structured output — typed extraction from model replies
//!
//! The model is asked for JSON only; the reply is scanned for the outermost
//! JSON object (models like to add preamble) and parsed into the caller's
//! type with serde.

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::providers::types::{ChatClient, ChatMessage, ChatRequest};
use crate::usage::AccumulatedUsage;

/// Ask the model for a typed value. `instructions` describe the task and the
/// expected JSON shape; `input` is the text to extract from.
pub async fn extract<T: DeserializeOwned>(
    client: &dyn ChatClient,
    instructions: &str,
    input: &str,
) -> Result<(T, AccumulatedUsage)> {
    let system = format!(
        "{}\n\nRespond with ONLY valid JSON, no explanation and no code fences.",
        instructions
    );
    let request = ChatRequest::new(system, vec![ChatMessage::user(input)]);

    let reply = client
        .chat(&request)
        .await
        .context("structured extraction request failed")?;

    let mut usage = AccumulatedUsage::new();
    if let Some(u) = reply.usage {
        usage.add(u.input_tokens, u.output_tokens);
    }

    let text = reply.text();
    debug!("structured extraction reply: {} chars", text.len());
    let value = parse_json_object(&text)?;
    Ok((value, usage))
}

/// Locate and parse the outermost JSON object in `text`
pub fn parse_json_object<T: DeserializeOwned>(text: &str) -> Result<T> {
    let start = text
        .find('{')
        .context("no JSON object found in model reply")?;
    let end = text
        .rfind('}')
        .context("no closing brace found in model reply")?;
    if end < start {
        bail!("no JSON object found in model reply");
    }
    let json = &text[start..=end];

    serde_json::from_str(json)
        .with_context(|| format!("failed to parse model reply as JSON: {:?}", json))
}
