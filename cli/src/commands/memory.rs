// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Principle and example introspection, plus memory statistics

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use memalign_core::application::MemAlignService;
use memalign_core::domain::evaluation::UpdateOutcome;
use memalign_core::domain::memory::{ExampleId, PrincipleId};

use crate::embedded;
use crate::output::{print_json, truncate};

#[derive(Subcommand)]
pub enum PrincipleCommand {
    /// List every principle of a judge
    List {
        #[arg(value_name = "JUDGE")]
        judge: String,
    },

    /// Replace a principle's text; may merge it into a near-identical sibling
    Update {
        #[arg(value_name = "JUDGE")]
        judge: String,

        #[arg(value_name = "PRINCIPLE_ID")]
        id: PrincipleId,

        /// New principle text
        #[arg(long)]
        text: String,
    },

    /// Delete a principle
    Delete {
        #[arg(value_name = "JUDGE")]
        judge: String,

        #[arg(value_name = "PRINCIPLE_ID")]
        id: PrincipleId,
    },
}

#[derive(Subcommand)]
pub enum ExampleCommand {
    /// List examples, or search them by similarity to a query
    List {
        #[arg(value_name = "JUDGE")]
        judge: String,

        /// Rank by similarity to this text
        #[arg(short, long)]
        query: Option<String>,

        /// Maximum number of examples
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete an example
    Delete {
        #[arg(value_name = "JUDGE")]
        judge: String,

        #[arg(value_name = "EXAMPLE_ID")]
        id: ExampleId,
    },
}

pub async fn handle_principles(command: PrincipleCommand, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let service = embedded::open(config_path)?;

    match command {
        PrincipleCommand::List { judge } => {
            let principles = service.list_principles(&judge).await?;
            if json {
                return print_json(&principles);
            }
            if principles.is_empty() {
                println!("{}", format!("No principles learned yet for '{}'", judge).yellow());
                return Ok(());
            }
            println!("{:<34} {:>7}  {}", "ID", "SUPPORT", "PRINCIPLE");
            for principle in principles {
                println!(
                    "{:<34} {:>7}  {}",
                    principle.id.to_string().dimmed(),
                    principle.support_count,
                    truncate(&principle.text, 80)
                );
            }
        }
        PrincipleCommand::Update { judge, id, text } => {
            let outcome = service.update_principle(&judge, id, &text).await?;
            if json {
                return print_json(&outcome);
            }
            match outcome {
                UpdateOutcome::Updated { principle_id } => {
                    println!("{}", format!("✓ Updated principle {}", principle_id).green())
                }
                UpdateOutcome::Merged { removed_id, merged_into } => println!(
                    "{}",
                    format!("✓ Principle {} now duplicates {} and was merged into it", removed_id, merged_into)
                        .yellow()
                ),
            }
        }
        PrincipleCommand::Delete { judge, id } => {
            service.delete_principle(&judge, id).await?;
            if json {
                return print_json(&serde_json::json!({ "deleted": id }));
            }
            println!("{}", format!("✓ Deleted principle {}", id).green());
        }
    }
    Ok(())
}

pub async fn handle_examples(command: ExampleCommand, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let service = embedded::open(config_path)?;

    match command {
        ExampleCommand::List { judge, query, limit } => {
            let examples = service.list_examples(&judge, query.as_deref(), limit).await?;
            if json {
                return print_json(&examples);
            }
            if examples.is_empty() {
                println!("{}", format!("No examples stored for '{}'", judge).yellow());
                return Ok(());
            }
            println!("{:<34} {:>5}  {:<40} {}", "ID", "SCORE", "INPUT", "FEEDBACK");
            for example in examples {
                println!(
                    "{:<34} {:>5}  {:<40} {}",
                    example.id.to_string().dimmed(),
                    example.expert_score,
                    truncate(&example.input_text, 40),
                    truncate(&example.expert_feedback, 50)
                );
            }
        }
        ExampleCommand::Delete { judge, id } => {
            service.delete_example(&judge, id).await?;
            if json {
                return print_json(&serde_json::json!({ "deleted": id }));
            }
            println!("{}", format!("✓ Deleted example {}", id).green());
        }
    }
    Ok(())
}

pub async fn stats(judge: String, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let service = embedded::open(config_path)?;
    let stats = service.memory_stats(&judge).await?;
    if json {
        return print_json(&stats);
    }

    let stamp = |t: Option<DateTime<Utc>>| t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string());
    println!("{}", stats.judge_name.to_string().bold());
    println!(
        "  Principles: {} (oldest {}, newest {})",
        stats.principle_count,
        stamp(stats.oldest_principle),
        stamp(stats.newest_principle)
    );
    println!(
        "  Examples:   {} (oldest {}, newest {})",
        stats.example_count,
        stamp(stats.oldest_example),
        stamp(stats.newest_example)
    );
    Ok(())
}
