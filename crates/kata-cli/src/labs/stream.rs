//! Lab 2 — streaming: print fragments as the model produces them
//!
//! Ctrl-c fires a cancellation token; the stream ends at the next fragment
//! boundary and whatever arrived so far still lands on the thread.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use kata_core::ConversationThread;

use super::{build_agent, load_config};

pub async fn run(config_path: &Option<PathBuf>, message: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let agent = build_agent(&config)?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let mut thread = ConversationThread::new();
    let mut stream = agent.send_stream(&mut thread, message, cancel.clone()).await?;

    let mut assembled = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        print!("{}", fragment);
        std::io::stdout().flush()?;
        assembled.push_str(&fragment);
    }
    println!();

    if cancel.is_cancelled() {
        println!("\n[cancelled after {} chars]", assembled.len());
    }
    thread.push_assistant(assembled);
    Ok(())
}
