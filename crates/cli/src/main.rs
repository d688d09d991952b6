//! Plantline CLI — the main entry point.
//!
//! Commands:
//! - `ask`    — Answer a single question
//! - `chat`   — Interactive conversation on one thread
//! - `doctor` — Diagnose configuration and backend connectivity

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "plantline",
    about = "Plantline — ask operational questions about your plant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// The question to answer
        question: String,

        /// Thread id to continue; defaults to the configured session id
        #[arg(short, long)]
        thread: Option<String>,
    },

    /// Interactive conversation on one thread
    Chat,

    /// Diagnose configuration and backend connectivity
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Ask { question, thread } => commands::ask::run(question, thread).await?,
        Commands::Chat => commands::chat::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
