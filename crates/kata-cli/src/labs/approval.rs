//! Lab 5 — human-in-the-loop approval
//!
//! Same tools as the previous lab, but every call goes through a console
//! prompt first. Denials are reported back to the model, which has to work
//! around them.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use kata_core::ConversationThread;
use kata_core::approval::{ConsoleApproval, GatedExecutor};

use super::tools::demo_registry;
use super::{build_agent, load_config};

const DEFAULT_MESSAGE: &str = "Use the calculator to work out 144 / 12, please.";

pub async fn run(config_path: &Option<PathBuf>, message: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;

    let gated = Arc::new(GatedExecutor::new(
        demo_registry(),
        Arc::new(ConsoleApproval),
    ));
    let agent = build_agent(&config)?.with_tools(gated);

    let message = message.unwrap_or(DEFAULT_MESSAGE);
    println!("Each tool call will ask for your approval.\n");

    let mut thread = ConversationThread::new();
    let reply = agent.send(&mut thread, message).await?;

    println!("\n{}", reply.text);
    Ok(())
}
