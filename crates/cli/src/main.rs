//! vaultqa CLI
//!
//! Main entry point for the vaultqa command-line tool: build an index over
//! a folder of documents and ask questions against it.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, HealthCommand, IndexCommand};
use std::path::PathBuf;
use vaultqa_core::{config::AppConfig, logging};

/// vaultqa - ask questions about your documents
#[derive(Parser, Debug)]
#[command(name = "vaultqa")]
#[command(about = "Index a folder of documents and retrieve relevant passages", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "VAULTQA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "VAULTQA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the index from the documents folder
    Index(IndexCommand),

    /// Retrieve the chunks most relevant to a question
    Ask(AskCommand),

    /// Report index status
    Health(HealthCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_with_file(cli.config)
        .context("Failed to load configuration")?
        .with_overrides(cli.workspace, None, cli.log_level, cli.verbose, cli.no_color);

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("vaultqa starting");
    tracing::debug!("Workspace: {:?}", config.workspace);

    config.validate()?;

    let command_name = match &cli.command {
        Commands::Index(_) => "index",
        Commands::Ask(_) => "ask",
        Commands::Health(_) => "health",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Index(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Health(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!(kind = e.kind(), "Command failed: {}", e),
    }

    result.with_context(|| format!("vaultqa {} failed", command_name))
}
