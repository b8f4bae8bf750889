//! Lab 9 — usage telemetry: token counts and estimated cost per interaction

use std::path::PathBuf;

use anyhow::Result;

use kata_core::{ConversationThread, PriceTable, UsageLog};

use super::{build_agent, load_config};

pub async fn run(config_path: &Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let agent = build_agent(&config)?;

    if !config.usage.enabled {
        println!("[usage] tracking is disabled in config; enable [usage].enabled to see costs");
    }

    let table = PriceTable::with_overrides(&config.usage.model_prices);
    let mut log = UsageLog::new(table);

    let mut thread = ConversationThread::new();

    let first = agent
        .send(&mut thread, "Name three uses for a local language model.")
        .await?;
    log.record(agent.model(), "first question", &first.usage);
    println!("{}\n", first.text);

    let second = agent
        .send(&mut thread, "Which of those would you try first, and why?")
        .await?;
    log.record(agent.model(), "follow-up", &second.usage);
    println!("{}\n", second.text);

    println!("{}", log.report());
    Ok(())
}
