//! Lab 1 — one-shot chat: one request, one reply

use std::path::PathBuf;

use anyhow::Result;

use kata_core::ConversationThread;

use super::{build_agent, load_config};

pub async fn run(config_path: &Option<PathBuf>, message: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let agent = build_agent(&config)?;

    let mut thread = ConversationThread::new();
    let reply = agent.send(&mut thread, message).await?;

    println!("{}", reply.text);
    println!(
        "\n[{} tokens across {} call(s)]",
        reply.usage.total_tokens(),
        reply.usage.api_calls
    );
    Ok(())
}
