use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod labs;

#[derive(Parser)]
#[command(name = "kata")]
#[command(version)]
#[command(about = "Hands-on labs for LLM chat clients and agents")]
struct Cli {
    /// Path to config file (default: ~/.kata/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the config directory and a default config file
    Init,

    /// Print the active "provider (model)" label
    Describe,

    /// Lab 1 — one-shot chat
    Chat {
        /// The message to send
        message: String,
    },

    /// Lab 2 — stream reply tokens as they arrive (ctrl-c cancels)
    Stream {
        /// The message to send
        message: String,
    },

    /// Lab 3 — multi-turn conversation on one thread
    Memory,

    /// Lab 4 — function/tool calling
    Tools {
        /// The message to send (defaults to a prompt that exercises both demo tools)
        message: Option<String>,
    },

    /// Lab 5 — human-in-the-loop tool approval
    Approval {
        /// The message to send
        message: Option<String>,
    },

    /// Lab 6 — structured output into a typed value
    Structured {
        /// The text to extract from
        message: Option<String>,
    },

    /// Lab 7 — multi-agent composition: a pipeline and a router
    Team {
        /// The request to run through both compositions
        message: Option<String>,
    },

    /// Lab 8 — expose the agent to peers over HTTP
    Serve,

    /// Lab 9 — usage telemetry and cost report
    Telemetry,

    /// Lab 10 — request/reply middleware interception
    Middleware {
        /// The message to send
        message: Option<String>,
    },

    /// Lab 11 — persist the conversation and resume it on the next run
    Resume {
        /// The message to send (defaults depend on whether a snapshot exists)
        message: Option<String>,

        /// Snapshot path
        #[arg(short, long, default_value = "kata-thread.json")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Describe => cmd_describe(&cli.config),
        Commands::Chat { message } => labs::chat::run(&cli.config, &message).await,
        Commands::Stream { message } => labs::stream::run(&cli.config, &message).await,
        Commands::Memory => labs::memory::run(&cli.config).await,
        Commands::Tools { message } => labs::tools::run(&cli.config, message.as_deref()).await,
        Commands::Approval { message } => {
            labs::approval::run(&cli.config, message.as_deref()).await
        }
        Commands::Structured { message } => {
            labs::structured::run(&cli.config, message.as_deref()).await
        }
        Commands::Team { message } => labs::team::run(&cli.config, message.as_deref()).await,
        Commands::Serve => labs::serve::run(&cli.config).await,
        Commands::Telemetry => labs::telemetry::run(&cli.config).await,
        Commands::Middleware { message } => {
            labs::middleware::run(&cli.config, message.as_deref()).await
        }
        Commands::Resume { message, path } => {
            labs::resume::run(&cli.config, message.as_deref(), &path).await
        }
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = labs::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;
        info!("Created default config at {}", config_path.display());
    }

    println!("kata initialized at {}", config_dir.display());
    println!(
        "Edit {} to pick a provider and set its credentials.",
        config_path.display()
    );
    Ok(())
}

fn cmd_describe(config_path: &Option<PathBuf>) -> Result<()> {
    let config = labs::load_config(config_path)?;
    println!("{}", kata_core::describe(&config));
    Ok(())
}
