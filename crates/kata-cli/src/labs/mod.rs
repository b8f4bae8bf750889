//! The labs — each one a short, linear program
//!
//! Every lab follows the same arc: load configuration, print the active
//! provider label, resolve a chat client, wrap it in an agent, issue a
//! request or two, print the result. Features layer on top of that skeleton
//! one lab at a time.

pub mod approval;
pub mod chat;
pub mod memory;
pub mod middleware;
pub mod resume;
pub mod serve;
pub mod stream;
pub mod structured;
pub mod team;
pub mod telemetry;
pub mod tools;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use kata_core::providers::types::ChatClient;
use kata_core::{Agent, ChatOptions, Config};

/// Default config location: ~/.kata
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kata")
}

pub fn load_config(custom_path: &Option<PathBuf>) -> Result<Config> {
    let path = custom_path
        .clone()
        .unwrap_or_else(|| config_dir().join("config.toml"));
    let config = Config::load(&path)
        .with_context(|| format!("run `kata init` first, then edit {}", path.display()))?;
    Ok(config)
}

/// Resolve the active provider and print the label the user should see
pub(crate) fn resolve_client(config: &Config) -> Result<Arc<dyn ChatClient>> {
    println!("Using {}\n", kata_core::describe(config));
    let client = kata_core::resolve(config)?;
    Ok(Arc::from(client))
}

pub(crate) fn chat_options(config: &Config) -> ChatOptions {
    ChatOptions {
        temperature: config.agent.temperature,
        max_tokens: Some(config.agent.max_tokens),
    }
}

/// The standard single-agent construction used by most labs
pub(crate) fn build_agent(config: &Config) -> Result<Agent> {
    let client = resolve_client(config)?;
    Ok(Agent::new("kata", config.agent.instructions.clone(), client)
        .with_options(chat_options(config)))
}
