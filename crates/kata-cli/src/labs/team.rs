//! Lab 7 — multi-agent composition
//!
//! Two shapes over the same client: a pipeline (drafter feeds an editor) and
//! a router (a coordinator picks the right specialist by name).

use std::path::PathBuf;

use anyhow::Result;

use kata_core::Agent;
use kata_core::team::{Pipeline, Router};

use super::{chat_options, load_config, resolve_client};

const DEFAULT_MESSAGE: &str = "Explain, in two sentences, why streams beat buffering whole replies.";

pub async fn run(config_path: &Option<PathBuf>, message: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let client = resolve_client(&config)?;
    let message = message.unwrap_or(DEFAULT_MESSAGE);

    // Pipeline: drafter -> editor
    let drafter = Agent::new(
        "drafter",
        "Write a first-draft answer to the request. Content over polish.",
        client.clone(),
    )
    .with_options(chat_options(&config));
    let editor = Agent::new(
        "editor",
        "You are given a draft. Tighten it and return only the improved text.",
        client.clone(),
    )
    .with_options(chat_options(&config));

    let pipeline = Pipeline::new(vec![drafter, editor])?;
    let piped = pipeline.run(message).await?;
    println!("— pipeline (drafter → editor) —\n{}\n", piped.text);

    // Router: coordinator dispatches to a named specialist
    let math = Agent::new(
        "math",
        "You answer mathematical questions precisely, showing the key step.",
        client.clone(),
    )
    .with_options(chat_options(&config));
    let prose = Agent::new(
        "prose",
        "You answer with clear, plain prose for a general audience.",
        client.clone(),
    )
    .with_options(chat_options(&config));

    let router = Router::new(client, vec![math, prose])?;
    let routed = router.run(message).await?;
    println!(
        "— router (handled by '{}') —\n{}\n",
        routed.specialist, routed.text
    );

    println!(
        "[pipeline: {} tokens, router: {} tokens]",
        piped.usage.total_tokens(),
        routed.usage.total_tokens()
    );
    Ok(())
}
