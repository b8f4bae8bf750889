//! Lab 10 — middleware interception
//!
//! A logger watches every request and reply; a redactor masks a sensitive
//! marker in outbound text before it ever reaches the provider.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use kata_core::ConversationThread;
use kata_core::middleware::{MiddlewareChain, Redactor, RequestLogger};

use super::{build_agent, load_config};

const DEFAULT_MESSAGE: &str =
    "Our internal codename is PROJECT-NIGHTJAR. Write one sentence announcing the launch without naming it.";

pub async fn run(config_path: &Option<PathBuf>, message: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;

    let chain = MiddlewareChain::new()
        .layer(Arc::new(RequestLogger))
        .layer(Arc::new(Redactor::new(vec![
            "PROJECT-NIGHTJAR".to_string(),
        ])));

    let agent = build_agent(&config)?.with_middleware(chain);

    let message = message.unwrap_or(DEFAULT_MESSAGE);
    println!("Sending (the codename is redacted before it leaves the process):\n  {}\n", message);

    let mut thread = ConversationThread::new();
    let reply = agent.send(&mut thread, message).await?;

    println!("{}", reply.text);
    Ok(())
}
