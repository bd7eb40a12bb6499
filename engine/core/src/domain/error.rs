// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Engine Error Taxonomy
//!
//! Every operation exposed by the memory engine fails with a [`MemAlignError`].
//! Variants map one-to-one onto the caller-visible failure classes:
//!
//! | Variant | Raised when | Side effects |
//! |---------|-------------|--------------|
//! | `Validation` | judge name, score range, score, blank text | none, operation not attempted |
//! | `NotFound` | unknown judge / principle / example | none |
//! | `ExternalProvider` | embedding, extraction or scoring call failed | per item; batches record and continue |
//! | `DuplicateJudge` | `create_judge` on an existing name | none |
//! | `ScoreOutOfRange` | scoring provider returned a score outside the range | judgment fails, never clamped |
//! | `EmptyMemory` | `require_memory` policy with no principles and no examples | none |
//!
//! Retries are never attempted here; they belong to the provider adapters.

use std::fmt;

use crate::domain::providers::ProviderError;
use crate::domain::repository::RepositoryError;

/// Kind of entity referenced by a [`MemAlignError::NotFound`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Judge,
    Principle,
    Example,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Judge => write!(f, "judge"),
            EntityKind::Principle => write!(f, "principle"),
            EntityKind::Example => write!(f, "example"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MemAlignError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("External provider error: {0}")]
    ExternalProvider(#[from] ProviderError),

    #[error("Judge '{0}' already exists")]
    DuplicateJudge(String),

    #[error("Score {score} outside configured range [{min}, {max}]")]
    ScoreOutOfRange { score: f64, min: i64, max: i64 },

    #[error("Judge '{0}' has no principles or examples to evaluate with")]
    EmptyMemory(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MemAlignError {
    pub fn validation(message: impl Into<String>) -> Self {
        MemAlignError::Validation(message.into())
    }

    pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
        MemAlignError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Short machine-readable label, used for batch error rows and API bodies
    pub fn code(&self) -> &'static str {
        match self {
            MemAlignError::Validation(_) => "validation_error",
            MemAlignError::NotFound { .. } => "not_found",
            MemAlignError::ExternalProvider(_) => "external_provider_error",
            MemAlignError::DuplicateJudge(_) => "duplicate_judge",
            MemAlignError::ScoreOutOfRange { .. } => "score_out_of_range",
            MemAlignError::EmptyMemory(_) => "empty_memory",
            MemAlignError::Repository(_) => "repository_error",
            MemAlignError::Internal(_) => "internal_error",
        }
    }
}

pub type MemAlignResult<T> = Result<T, MemAlignError>;
