// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use memalign_core::application::{CreateJudgeRequest, MemAlignService};

use crate::embedded;
use crate::output::{print_json, truncate};

#[derive(Subcommand)]
pub enum JudgeCommand {
    /// Create a judge
    Create {
        /// Judge name (lowercase letters, digits and hyphens)
        #[arg(value_name = "NAME")]
        name: String,

        /// What the judge evaluates
        #[arg(long)]
        criterion: String,

        /// Free-text evaluation instructions
        #[arg(long, default_value = "")]
        instructions: String,

        /// Lowest score
        #[arg(long, default_value_t = 1)]
        min_score: i64,

        /// Highest score
        #[arg(long, default_value_t = 5)]
        max_score: i64,
    },

    /// List judges with their memory sizes
    List,

    /// Show one judge
    Show {
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Delete a judge and all of its memory
    Delete {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

pub async fn handle_command(command: JudgeCommand, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let service = embedded::open(config_path)?;

    match command {
        JudgeCommand::Create {
            name,
            criterion,
            instructions,
            min_score,
            max_score,
        } => {
            let judge = service
                .create_judge(CreateJudgeRequest {
                    name,
                    criterion,
                    instructions,
                    min_score,
                    max_score,
                })
                .await?;
            if json {
                return print_json(&judge);
            }
            println!(
                "{}",
                format!("✓ Created judge '{}' (scores {})", judge.name, judge.score_range).green()
            );
        }
        JudgeCommand::List => {
            let judges = service.list_judges().await?;
            if json {
                return print_json(&judges);
            }
            if judges.is_empty() {
                println!("{}", "No judges found".yellow());
                return Ok(());
            }

            println!("{} judges found:", judges.len());
            println!("{:<24} {:<8} {:>10} {:>9}  {}", "NAME", "RANGE", "PRINCIPLES", "EXAMPLES", "CRITERION");
            for summary in judges {
                println!(
                    "{:<24} {:<8} {:>10} {:>9}  {}",
                    summary.judge.name.to_string().bold(),
                    summary.judge.score_range.to_string(),
                    summary.principle_count,
                    summary.example_count,
                    truncate(&summary.judge.criterion, 40)
                );
            }
        }
        JudgeCommand::Show { name } => {
            let judge = service.get_judge(&name).await?;
            if json {
                return print_json(&judge);
            }
            println!("{}", judge.name.to_string().bold());
            println!("  Criterion:    {}", judge.criterion);
            if !judge.instructions.is_empty() {
                println!("  Instructions: {}", judge.instructions);
            }
            println!("  Score range:  {}", judge.score_range);
            println!("  Created:      {}", judge.created_at.to_rfc3339());
        }
        JudgeCommand::Delete { name } => {
            service.delete_judge(&name).await?;
            if json {
                return print_json(&serde_json::json!({ "deleted": name }));
            }
            println!("{}", format!("✓ Deleted judge '{}'", name).green());
        }
    }

    Ok(())
}
