// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Result shapes returned by alignment and judgment, plus batch reports

use serde::{Deserialize, Serialize};

use crate::domain::judge::JudgeName;
use crate::domain::memory::{ExampleId, PrincipleId};

/// Outcome of a single `SemanticMemory::merge`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub principle_id: PrincipleId,
    pub was_new: bool,
}

/// Outcome of `SemanticMemory::update_text`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Text and embedding replaced in place
    Updated { principle_id: PrincipleId },
    /// New text duplicated a sibling; the updated row was folded into it and removed
    Merged {
        removed_id: PrincipleId,
        merged_into: PrincipleId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentResult {
    pub judge_name: JudgeName,
    pub example_id: ExampleId,
    /// Candidates that produced a new principle or reinforced an existing one
    pub principles_extracted: usize,
    /// Candidates that matched an existing principle and were merged
    pub principles_deduplicated: usize,
    /// Principles touched, in candidate order
    pub principle_ids: Vec<PrincipleId>,
    pub total_principles: usize,
    pub total_examples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentResult {
    pub judge_name: JudgeName,
    pub score: i64,
    pub reasoning: String,
    pub principles_used: usize,
    pub examples_retrieved: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractiveStatus {
    AwaitingFeedback,
}

/// First half of an interactive alignment: the judge's current verdict,
/// waiting for the expert to agree or send feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractiveEvaluation {
    pub status: InteractiveStatus,
    pub judge_evaluation: JudgmentResult,
    pub next_step: String,
}

impl InteractiveEvaluation {
    pub fn awaiting_feedback(judge_evaluation: JudgmentResult) -> Self {
        let next_step = format!(
            "If you disagree with this evaluation, align judge '{}' with your expert feedback, \
             score and this judge_output/judge_score",
            judge_evaluation.judge_name
        );
        Self {
            status: InteractiveStatus::AwaitingFeedback,
            judge_evaluation,
            next_step,
        }
    }
}

/// One input row for `judge_batch`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentInput {
    pub input_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// A failed batch row; `line` is 1-based
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRowError {
    pub line: usize,
    pub error: String,
}

/// A successful batch row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRow<T> {
    pub line: usize,
    #[serde(flatten)]
    pub result: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport<T> {
    pub processed: usize,
    pub errors: Vec<BatchRowError>,
    pub results: Vec<BatchRow<T>>,
}

impl<T> BatchReport<T> {
    pub fn new() -> Self {
        Self {
            processed: 0,
            errors: Vec::new(),
            results: Vec::new(),
        }
    }

    pub fn record_success(&mut self, line: usize, result: T) {
        self.processed += 1;
        self.results.push(BatchRow { line, result });
    }

    pub fn record_error(&mut self, line: usize, error: impl ToString) {
        self.errors.push(BatchRowError {
            line,
            error: error.to_string(),
        });
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_report_counts() {
        let mut report: BatchReport<u32> = BatchReport::new();
        report.record_success(1, 10);
        report.record_error(2, "bad row");
        report.record_success(3, 30);

        assert_eq!(report.processed, 2);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.errors[0].line, 2);
        assert_eq!(report.results[1].line, 3);
    }

    #[test]
    fn test_update_outcome_serializes_with_status_tag() {
        let outcome = UpdateOutcome::Updated { principle_id: PrincipleId::new() };
        let json = serde_json::to_value(outcome).unwrap();
        assert_eq!(json["status"], "updated");
    }
}
