// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

use memalign_core::application::MemAlignService;
use memalign_core::domain::evaluation::{BatchReport, JudgmentResult};

use crate::embedded;
use crate::output::{print_batch_summary, print_json, truncate};

#[derive(Args)]
pub struct EvaluateArgs {
    /// Judge name
    #[arg(value_name = "JUDGE")]
    pub judge: String,

    /// Input to score
    #[arg(long)]
    pub input: String,

    /// Extra context shown to the judge
    #[arg(long)]
    pub context: Option<String>,
}

#[derive(Args)]
pub struct EvaluateBatchArgs {
    /// Judge name
    #[arg(value_name = "JUDGE")]
    pub judge: String,

    /// JSONL file of {"input_text": ..., "context": ...} rows
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Write per-row results here as JSONL
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub async fn evaluate(args: EvaluateArgs, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let service = embedded::open(config_path)?;
    let result = service
        .judge(&args.judge, &args.input, args.context.as_deref())
        .await?;
    if json {
        return print_json(&result);
    }

    println!("{} {}", "Score:".bold(), result.score.to_string().cyan().bold());
    println!(
        "{}",
        format!(
            "(using {} principles, {} examples)",
            result.principles_used, result.examples_retrieved
        )
        .dimmed()
    );
    println!();
    println!("{}", result.reasoning);
    Ok(())
}

pub async fn evaluate_batch(args: EvaluateBatchArgs, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let service = embedded::open(config_path)?;
    let report = service.judge_batch(&args.judge, &content).await?;

    if let Some(output) = &args.output {
        write_results(&report, output).await?;
    }
    if json {
        return print_json(&report);
    }

    print_batch_summary(&report);
    for row in &report.results {
        println!(
            "  line {:<4} score {:<4} {}",
            row.line,
            row.result.score,
            truncate(&row.result.reasoning, 60).dimmed()
        );
    }
    if let Some(output) = &args.output {
        println!("{}", format!("✓ Results written to {}", output.display()).green());
    }
    Ok(())
}

/// One JSON object per successful row, tagged with its input line
pub async fn write_results(report: &BatchReport<JudgmentResult>, path: &Path) -> Result<()> {
    let mut lines = String::new();
    for row in &report.results {
        lines.push_str(&serde_json::to_string(row)?);
        lines.push('\n');
    }
    tokio::fs::write(path, lines)
        .await
        .with_context(|| format!("Failed to write results to {}", path.display()))?;
    Ok(())
}
