//! Lab 3 — multi-turn memory: a REPL on a single thread
//!
//! Every turn re-sends the full thread, so the model sees the whole
//! conversation each time. Type "exit" to leave.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;

use kata_core::ConversationThread;

use super::{build_agent, load_config};

pub async fn run(config_path: &Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    let agent = build_agent(&config)?;

    println!("Multi-turn chat. Type 'exit' to leave.\n");

    let mut thread = ConversationThread::new();
    loop {
        print!("you> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        let reply = agent.send(&mut thread, line).await?;
        println!("kata> {}\n", reply.text);
    }

    println!("[{} turn(s) accumulated on thread {}]", thread.len(), thread.id());
    Ok(())
}
