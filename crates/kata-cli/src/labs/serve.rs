//! Lab 8 — protocol exposure: put the agent behind an HTTP surface
//!
//! Peers discover the agent via its card and submit chat tasks. Try:
//!   curl http://127.0.0.1:8787/.well-known/agent.json
//!   curl -X POST http://127.0.0.1:8787/v1/chat -d '{"message": "hello"}'

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use kata_serve::{AgentCard, AgentServer};

use super::{build_agent, load_config};

pub async fn run(config_path: &Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let agent = build_agent(&config)?;

    let card = AgentCard {
        name: "kata".to_string(),
        description: "Lab agent exposed over HTTP".to_string(),
        provider: agent.client().provider_name().to_string(),
        model: agent.model().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let server = Arc::new(AgentServer::new(
        Arc::new(agent),
        card,
        config.serve.auth_token.clone(),
    ));

    println!(
        "Serving on http://{}:{} (ctrl-c to stop)",
        config.serve.bind, config.serve.port
    );
    server.serve(&config.serve.bind, config.serve.port).await
}
