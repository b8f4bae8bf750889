//! Lab 6 — structured output: extract a typed value from free text

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use kata_core::structured;

use super::{load_config, resolve_client};

const DEFAULT_MESSAGE: &str =
    "Team retro next Tuesday at 9am in the harbor conference room with Ana, Luis, and Priya.";

#[derive(Debug, Serialize, Deserialize)]
struct EventDetails {
    title: String,
    date: String,
    location: String,
    attendees: Vec<String>,
}

const INSTRUCTIONS: &str = r#"Extract the event described in the user's message. Use this JSON shape:
{
  "title": "<short event title>",
  "date": "<date/time as stated>",
  "location": "<where, or empty string>",
  "attendees": ["<name>", "..."]
}"#;

pub async fn run(config_path: &Option<PathBuf>, message: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let client = resolve_client(&config)?;

    let message = message.unwrap_or(DEFAULT_MESSAGE);
    println!("Extracting from: {}\n", message);

    let (event, usage) =
        structured::extract::<EventDetails>(client.as_ref(), INSTRUCTIONS, message).await?;

    println!("{}", serde_json::to_string_pretty(&event)?);
    println!("\n[parsed into EventDetails; {} tokens]", usage.total_tokens());
    Ok(())
}
