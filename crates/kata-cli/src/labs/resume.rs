//! Lab 11 — conversation persistence
//!
//! First run: start a thread, teach it something, snapshot to disk.
//! Second run: restore the snapshot and ask a question that only works if
//! the prior context survived.

use std::path::{Path, PathBuf};

use anyhow::Result;

use kata_core::ConversationThread;

use super::{build_agent, load_config};

const FRESH_MESSAGE: &str = "Remember this number for later: 47.";
const RESUMED_MESSAGE: &str = "What number did I ask you to remember?";

pub async fn run(
    config_path: &Option<PathBuf>,
    message: Option<&str>,
    snapshot_path: &Path,
) -> Result<()> {
    let config = load_config(config_path)?;
    let agent = build_agent(&config)?;

    let (mut thread, default_message) = if snapshot_path.exists() {
        let thread = ConversationThread::load(snapshot_path)?;
        println!(
            "Resumed thread {} with {} prior turn(s) from {}\n",
            thread.id(),
            thread.len(),
            snapshot_path.display()
        );
        (thread, RESUMED_MESSAGE)
    } else {
        println!("No snapshot at {}; starting fresh\n", snapshot_path.display());
        (ConversationThread::new(), FRESH_MESSAGE)
    };

    let message = message.unwrap_or(default_message);
    println!("you> {}", message);

    let reply = agent.send(&mut thread, message).await?;
    println!("kata> {}\n", reply.text);

    thread.save(snapshot_path)?;
    println!(
        "Saved {} turn(s) to {} — run this lab again to resume.",
        thread.len(),
        snapshot_path.display()
    );
    Ok(())
}
