// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # MemAlign CLI
//!
//! The `memalign` binary drives the dual-memory judge engine in-process, or
//! serves it over HTTP with `memalign serve`.
//!
//! ## Commands
//!
//! - `memalign judges create|list|show|delete` - Judge management
//! - `memalign align` / `align-batch` / `align-interactive` - Teach a judge from expert feedback
//! - `memalign evaluate` / `evaluate-batch` - Score inputs with a judge
//! - `memalign principles list|update|delete` - Semantic memory
//! - `memalign examples list|delete` - Episodic memory
//! - `memalign stats` - Memory statistics
//! - `memalign config show|validate|generate` - Configuration management
//! - `memalign serve` - HTTP API and Prometheus metrics

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use memalign_cli::commands::{
    self, AlignArgs, AlignBatchArgs, AlignInteractiveArgs, ConfigCommand, EvaluateArgs, EvaluateBatchArgs, ExampleCommand, JudgeCommand,
    PrincipleCommand,
};
use memalign_cli::server::{self, ServeArgs};

/// MemAlign - memory-augmented LLM judges that learn from expert feedback
#[derive(Parser)]
#[command(name = "memalign")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, env = "MEMALIGN_CONFIG_PATH", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "MEMALIGN_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Judge management
    #[command(name = "judges")]
    Judges {
        #[command(subcommand)]
        command: JudgeCommand,
    },

    /// Align a judge with one piece of expert feedback
    Align(AlignArgs),

    /// Judge an input, then optionally teach the judge from your feedback
    #[command(name = "align-interactive")]
    AlignInteractive(AlignInteractiveArgs),

    /// Align a judge from a JSONL file of feedback records
    #[command(name = "align-batch")]
    AlignBatch(AlignBatchArgs),

    /// Score an input with a judge
    Evaluate(EvaluateArgs),

    /// Score every input of a JSONL file
    #[command(name = "evaluate-batch")]
    EvaluateBatch(EvaluateBatchArgs),

    /// Semantic memory (principles)
    #[command(name = "principles")]
    Principles {
        #[command(subcommand)]
        command: PrincipleCommand,
    },

    /// Episodic memory (examples)
    #[command(name = "examples")]
    Examples {
        #[command(subcommand)]
        command: ExampleCommand,
    },

    /// Memory statistics for a judge
    Stats {
        /// Judge name
        #[arg(value_name = "JUDGE")]
        judge: String,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Serve the HTTP API
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is not an error
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let json = cli.json;
    match cli.command {
        Commands::Judges { command } => commands::judge::handle_command(command, cli.config, json).await,
        Commands::Align(args) => commands::align::align(args, cli.config, json).await,
        Commands::AlignInteractive(args) => commands::align::align_interactive(args, cli.config, json).await,
        Commands::AlignBatch(args) => commands::align::align_batch(args, cli.config, json).await,
        Commands::Evaluate(args) => commands::evaluate::evaluate(args, cli.config, json).await,
        Commands::EvaluateBatch(args) => commands::evaluate::evaluate_batch(args, cli.config, json).await,
        Commands::Principles { command } => commands::memory::handle_principles(command, cli.config, json).await,
        Commands::Examples { command } => commands::memory::handle_examples(command, cli.config, json).await,
        Commands::Stats { judge } => commands::memory::stats(judge, cli.config, json).await,
        Commands::Config { command } => commands::config::handle_command(command, cli.config).await,
        Commands::Serve(args) => server::serve(args, cli.config).await,
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
