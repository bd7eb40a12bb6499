// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Collaborator Contracts
//!
//! The memory engine consumes three external collaborators. All of them are
//! potential suspension points and are injected as `Arc<dyn _>` so tests can
//! drive the engine with deterministic fakes.
//!
//! | Trait | Contract |
//! |-------|----------|
//! | [`EmbeddingProvider`] | `embed(text) -> vector<f32, D>`, pure function of (model, text) |
//! | [`ExtractionProvider`] | `extract(request) -> candidate principle strings`, may be empty |
//! | [`JudgmentProvider`] | `score(request) -> (score, reasoning)` |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::llm::LLMError;
use crate::domain::memory::{Example, FeedbackInput};
use crate::domain::judge::ScoreRange;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LLMError),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Prompt rendering failed: {0}")]
    Prompt(String),
}

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text into a vector of `dimension()` floats
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    /// Model identifier; embeddings are only comparable within one model
    fn model_id(&self) -> &str;

    fn dimension(&self) -> usize;
}

/// Everything the extractor sees for one piece of feedback
#[derive(Debug, Clone)]
pub struct ExtractionRequest<'a> {
    pub criterion: &'a str,
    pub instructions: &'a str,
    pub feedback: &'a FeedbackInput,
    /// Principles already stored for the judge, so the extractor can avoid restating them
    pub existing_principles: Vec<String>,
}

#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    /// Returns candidate principle texts in generation order
    async fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Vec<String>, ProviderError>;
}

/// Everything the scorer sees for one judgment
#[derive(Debug, Clone)]
pub struct ScoringRequest<'a> {
    pub criterion: &'a str,
    pub instructions: &'a str,
    pub score_range: ScoreRange,
    pub principles: Vec<&'a str>,
    pub examples: Vec<&'a Example>,
    pub input_text: &'a str,
    pub context: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderScore {
    pub score: f64,
    pub reasoning: String,
}

#[async_trait]
pub trait JudgmentProvider: Send + Sync {
    async fn score(&self, request: &ScoringRequest<'_>) -> Result<ProviderScore, ProviderError>;
}
