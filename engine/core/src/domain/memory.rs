// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Dual Memory Model
//!
//! - [`Principle`]: semantic memory unit, a generalised evaluation rule.
//!   Every principle of a judge is loaded into working memory.
//! - [`Example`]: episodic memory unit, a concrete (input, feedback, score)
//!   record. Only the top-k most similar examples are loaded.
//!
//! Both records carry their embedding so the vector index can be rebuilt
//! from the persistence layer without re-embedding.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::MemAlignError;
use crate::domain::judge::JudgeName;

macro_rules! memory_id {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0.simple())
            }
        }

        impl FromStr for $name {
            type Err = MemAlignError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| MemAlignError::validation(format!("Invalid {} id: '{}'", $label, s)))
            }
        }
    };
}

memory_id!(PrincipleId, "principle");
memory_id!(ExampleId, "example");

/// Which half of a judge's memory a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    Semantic,
    Episodic,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryKind::Semantic => write!(f, "semantic"),
            MemoryKind::Episodic => write!(f, "episodic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principle {
    pub id: PrincipleId,
    pub judge_name: JudgeName,
    pub text: String,
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
    /// Examples that contributed evidence; grows on merge
    pub source_example_ids: BTreeSet<ExampleId>,
    /// Number of times equivalent feedback reinforced this principle
    pub support_count: u64,
}

impl Principle {
    pub fn new(
        judge_name: JudgeName,
        text: String,
        embedding: Vec<f32>,
        source: Option<ExampleId>,
    ) -> Self {
        Self {
            id: PrincipleId::new(),
            judge_name,
            text,
            embedding,
            created_at: Utc::now(),
            source_example_ids: source.into_iter().collect(),
            support_count: 1,
        }
    }

    /// Records another piece of equivalent feedback (deduplication hit)
    pub fn reinforce(&mut self, source: Option<ExampleId>) {
        self.support_count += 1;
        if let Some(example_id) = source {
            self.source_example_ids.insert(example_id);
        }
    }

    /// Folds another principle's provenance and support into this one
    pub fn absorb(&mut self, other: &Principle) {
        self.support_count += other.support_count;
        self.source_example_ids
            .extend(other.source_example_ids.iter().copied());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub id: ExampleId,
    pub judge_name: JudgeName,
    pub input_text: String,
    pub expert_feedback: String,
    pub expert_score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_score: Option<i64>,
    /// Embedding of `input_text`
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl Example {
    pub fn new(judge_name: JudgeName, feedback: FeedbackInput, embedding: Vec<f32>) -> Self {
        Self {
            id: ExampleId::new(),
            judge_name,
            input_text: feedback.input_text,
            expert_feedback: feedback.expert_feedback,
            expert_score: feedback.expert_score,
            judge_output: feedback.judge_output,
            judge_score: feedback.judge_score,
            embedding,
            created_at: Utc::now(),
        }
    }
}

/// One unit of expert feedback, as submitted to `align` or read from a JSONL row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackInput {
    pub input_text: String,
    pub expert_feedback: String,
    pub expert_score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_score: Option<i64>,
}

impl FeedbackInput {
    pub fn new(
        input_text: impl Into<String>,
        expert_feedback: impl Into<String>,
        expert_score: i64,
    ) -> Self {
        Self {
            input_text: input_text.into(),
            expert_feedback: expert_feedback.into(),
            expert_score,
            judge_output: None,
            judge_score: None,
        }
    }

    pub fn with_judge_attempt(mut self, output: impl Into<String>, score: Option<i64>) -> Self {
        self.judge_output = Some(output.into());
        self.judge_score = score;
        self
    }
}

/// Per-judgment evaluation context; never persisted
#[derive(Debug, Clone, Default)]
pub struct WorkingMemory {
    /// Full principle set of the judge, unranked
    pub principles: Vec<Principle>,
    /// Top-k examples by similarity to the query input, most similar first
    pub examples: Vec<Example>,
}

impl WorkingMemory {
    pub fn is_empty(&self) -> bool {
        self.principles.is_empty() && self.examples.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub judge_name: JudgeName,
    pub principle_count: usize,
    pub example_count: usize,
    pub oldest_principle: Option<DateTime<Utc>>,
    pub newest_principle: Option<DateTime<Utc>>,
    pub oldest_example: Option<DateTime<Utc>>,
    pub newest_example: Option<DateTime<Utc>>,
}

impl MemoryStats {
    pub fn from_records(judge_name: JudgeName, principles: &[Principle], examples: &[Example]) -> Self {
        Self {
            judge_name,
            principle_count: principles.len(),
            example_count: examples.len(),
            oldest_principle: principles.iter().map(|p| p.created_at).min(),
            newest_principle: principles.iter().map(|p| p.created_at).max(),
            oldest_example: examples.iter().map(|e| e.created_at).min(),
            newest_example: examples.iter().map(|e| e.created_at).max(),
        }
    }
}
