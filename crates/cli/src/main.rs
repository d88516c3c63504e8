//! Research Assistant CLI
//!
//! Main entry point for the assistant command-line tool.
//! Answers questions from a local knowledge base through the safety-gated
//! maker-checker pipeline.

mod commands;

use assistant_core::{config::AppConfig, logging, AppResult};
use clap::{Parser, Subcommand};
use commands::{AskCommand, BatchCommand, HealthCommand, HistoryCommand, KnowledgeCommand};
use std::path::PathBuf;

/// Research Assistant - reviewed answers from your own documents
#[derive(Parser, Debug)]
#[command(name = "assistant")]
#[command(about = "Safety-gated, reviewed answers from a local knowledge base", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "ASSISTANT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "ASSISTANT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask a question against the knowledge base
    Ask(AskCommand),

    /// Answer one question per line of a file
    Batch(BatchCommand),

    /// Knowledge base management
    Knowledge(KnowledgeCommand),

    /// Show recorded queries and their outcomes
    History(HistoryCommand),

    /// Report service health
    Health(HealthCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Batch(_) => "batch",
            Commands::Knowledge(_) => "knowledge",
            Commands::History(_) => "history",
            Commands::Health(_) => "health",
        }
    }

    async fn run(self, config: AppConfig) -> AppResult<()> {
        match self {
            Commands::Ask(cmd) => cmd.execute(config).await,
            Commands::Batch(cmd) => cmd.execute(config).await,
            Commands::Knowledge(cmd) => cmd.execute(&config).await,
            Commands::History(cmd) => cmd.execute(&config).await,
            Commands::Health(cmd) => cmd.execute(&config).await,
        }
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // Workspace file and environment first, then flags on top
    let config = AppConfig::load_with(cli.workspace, cli.config)?.with_overrides(
        cli.log_level,
        cli.verbose,
        cli.no_color,
        None,
        None,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;
    tracing::debug!("Workspace: {:?}", config.workspace);

    config.validate()?;
    config.ensure_assistant_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = cli.command.run(config).await;
    if let Err(e) = &result {
        tracing::error!("Command failed: {}", e);
    }
    result
}
