// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use dialoguer::{Confirm, Input};
use std::path::PathBuf;

use memalign_core::application::MemAlignService;
use memalign_core::domain::evaluation::AlignmentResult;
use memalign_core::domain::memory::FeedbackInput;

use crate::embedded;
use crate::output::{print_batch_summary, print_json};

#[derive(Args)]
pub struct AlignArgs {
    /// Judge name
    #[arg(value_name = "JUDGE")]
    pub judge: String,

    /// Input the expert reviewed
    #[arg(long)]
    pub input: String,

    /// Expert feedback on the input
    #[arg(long)]
    pub feedback: String,

    /// Expert score
    #[arg(long)]
    pub score: i64,

    /// The judge's own earlier output, for contrast
    #[arg(long)]
    pub judge_output: Option<String>,

    /// The judge's own earlier score
    #[arg(long, requires = "judge_output")]
    pub judge_score: Option<i64>,
}

#[derive(Args)]
pub struct AlignInteractiveArgs {
    /// Judge name
    #[arg(value_name = "JUDGE")]
    pub judge: String,

    /// Input to evaluate first
    #[arg(long)]
    pub input: String,

    /// Extra context shown to the judge
    #[arg(long)]
    pub context: Option<String>,

    /// Only show the evaluation; do not ask for feedback
    #[arg(long)]
    pub no_prompt: bool,
}

#[derive(Args)]
pub struct AlignBatchArgs {
    /// Judge name
    #[arg(value_name = "JUDGE")]
    pub judge: String,

    /// JSONL file: input_text, expert_feedback, expert_score, optional judge_output/judge_score
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

pub async fn align(args: AlignArgs, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let service = embedded::open(config_path)?;

    let mut feedback = FeedbackInput::new(args.input, args.feedback, args.score);
    if let Some(output) = args.judge_output {
        feedback = feedback.with_judge_attempt(output, args.judge_score);
    }

    let result = service.align(&args.judge, feedback).await?;
    if json {
        return print_json(&result);
    }

    print_alignment(&result);
    Ok(())
}

fn print_alignment(result: &AlignmentResult) {
    println!("{}", format!("✓ Stored example {}", result.example_id).green());
    println!(
        "  Principles: {} extracted, {} merged into existing",
        result.principles_extracted, result.principles_deduplicated
    );
    println!(
        "  Memory:     {} principles, {} examples",
        result.total_principles, result.total_examples
    );
}

/// Judge the input, then ask the expert whether to teach the judge
pub async fn align_interactive(args: AlignInteractiveArgs, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let service = embedded::open(config_path)?;
    let evaluation = service
        .align_interactive(&args.judge, &args.input, args.context.as_deref())
        .await?;
    if json {
        return print_json(&evaluation);
    }

    let verdict = &evaluation.judge_evaluation;
    println!("{} {}", "Score:".bold(), verdict.score.to_string().cyan().bold());
    println!("{}", verdict.reasoning);
    println!();
    if args.no_prompt {
        println!("{}", evaluation.next_step.dimmed());
        return Ok(());
    }

    let agrees = Confirm::new()
        .with_prompt("Do you agree with this evaluation?")
        .default(true)
        .interact()?;
    if agrees {
        println!("{}", "Nothing to learn; memory unchanged".dimmed());
        return Ok(());
    }

    let range = service.get_judge(&args.judge).await?.score_range;
    let feedback: String = Input::new()
        .with_prompt("Expert feedback")
        .validate_with(|text: &String| -> Result<(), &'static str> {
            if text.trim().is_empty() {
                Err("feedback cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    let score: i64 = Input::new()
        .with_prompt(format!("Expert score ({})", range))
        .validate_with(|score: &i64| -> Result<(), String> {
            if range.contains(*score) {
                Ok(())
            } else {
                Err(format!("score must lie in {}", range))
            }
        })
        .interact_text()?;

    let attempt = FeedbackInput::new(args.input, feedback, score)
        .with_judge_attempt(verdict.reasoning.clone(), Some(verdict.score));
    let result = service.align(&args.judge, attempt).await?;
    print_alignment(&result);
    Ok(())
}

pub async fn align_batch(args: AlignBatchArgs, config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let service = embedded::open(config_path)?;
    let report = service.align_batch(&args.judge, &content).await?;
    if json {
        return print_json(&report);
    }

    print_batch_summary(&report);
    let deduplicated: usize = report.results.iter().map(|r| r.result.principles_deduplicated).sum();
    let extracted: usize = report.results.iter().map(|r| r.result.principles_extracted).sum();
    println!("  Principles: {} extracted, {} merged into existing", extracted, deduplicated);
    Ok(())
}
