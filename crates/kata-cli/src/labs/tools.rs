//! Lab 4 — function/tool calling
//!
//! The model decides which of the demo tools to call; the agent loop executes
//! them and feeds results back until the model settles on a text answer.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use kata_core::ConversationThread;
use kata_core::tools::ToolRegistry;
use kata_core::tools::demo::{CalculatorTool, CurrentTimeTool};

use super::{build_agent, load_config};

const DEFAULT_MESSAGE: &str = "What time is it right now (UTC), and what is 12.5 * 8?";

pub fn demo_registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(CurrentTimeTool));
    registry.register(Arc::new(CalculatorTool));
    Arc::new(registry)
}

pub async fn run(config_path: &Option<PathBuf>, message: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let agent = build_agent(&config)?.with_tools(demo_registry());

    let message = message.unwrap_or(DEFAULT_MESSAGE);
    let mut thread = ConversationThread::new();
    let reply = agent.send(&mut thread, message).await?;

    println!("{}", reply.text);
    if reply.usage.tool_calls.is_empty() {
        println!("\n[no tools were called]");
    } else {
        println!("\n[tools called: {}]", reply.usage.tool_calls.join(", "));
    }
    Ok(())
}
