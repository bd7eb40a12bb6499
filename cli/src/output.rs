// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Terminal rendering shared by the command handlers

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use memalign_core::domain::evaluation::BatchReport;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Trim long text to one table cell
pub fn truncate(text: &str, width: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() <= width {
        return single_line;
    }
    let cut: String = single_line.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", cut)
}

/// Summary line plus one line per failed row
pub fn print_batch_summary<T>(report: &BatchReport<T>) {
    let summary = format!("{} processed, {} errors", report.processed, report.error_count());
    if report.errors.is_empty() {
        println!("{}", format!("✓ {}", summary).green());
    } else {
        println!("{}", format!("⚠ {}", summary).yellow());
        for error in &report.errors {
            println!("  line {}: {}", error.line, error.error.red());
        }
    }
}
