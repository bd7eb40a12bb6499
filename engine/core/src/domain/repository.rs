// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for judges and their memory records, following the
//! DDD Repository pattern: interface defined in the domain layer, implemented
//! in `crate::infrastructure::repositories`.
//!
//! | Trait | Records | Implementations |
//! |-------|---------|----------------|
//! | `JudgeRepository` | `Judge` | `InMemoryJudgeRepository`, `SledStore` |
//! | `MemoryRepository` | `Principle`, `Example` | `InMemoryMemoryRepository`, `SledStore` |
//!
//! ## Storage Backend Abstraction
//!
//! The backend is selected at startup from `MemAlignConfig::storage`.
//! In-memory implementations are used for tests and throwaway sessions; the
//! sled store keeps everything under `data_dir` across restarts.
//!
//! Records carry their embeddings, so the vector index contents are part of
//! what is persisted.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::judge::{Judge, JudgeName};
use crate::domain::memory::{Example, ExampleId, Principle, PrincipleId};

/// Storage backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Sled,
}

#[async_trait]
pub trait JudgeRepository: Send + Sync {
    /// Save judge (create or replace)
    async fn save(&self, judge: &Judge) -> Result<(), RepositoryError>;

    async fn find_by_name(&self, name: &JudgeName) -> Result<Option<Judge>, RepositoryError>;

    /// List all judges, sorted by name
    async fn list_all(&self) -> Result<Vec<Judge>, RepositoryError>;

    /// Delete judge by name; returns whether it existed
    async fn delete(&self, name: &JudgeName) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait MemoryRepository: Send + Sync {
    /// Save principle (create or replace)
    async fn save_principle(&self, principle: &Principle) -> Result<(), RepositoryError>;

    /// Delete principle; deleting a missing id is a no-op
    async fn delete_principle(&self, judge: &JudgeName, id: PrincipleId) -> Result<(), RepositoryError>;

    async fn load_principles(&self, judge: &JudgeName) -> Result<Vec<Principle>, RepositoryError>;

    /// Save `survivor` and delete `removed` in one atomic write
    async fn merge_principles(&self, survivor: &Principle, removed: PrincipleId) -> Result<(), RepositoryError>;

    async fn save_example(&self, example: &Example) -> Result<(), RepositoryError>;

    /// Delete example; deleting a missing id is a no-op
    async fn delete_example(&self, judge: &JudgeName, id: ExampleId) -> Result<(), RepositoryError>;

    async fn load_examples(&self, judge: &JudgeName) -> Result<Vec<Example>, RepositoryError>;

    /// Remove every principle and example of a judge
    async fn purge_judge(&self, judge: &JudgeName) -> Result<(), RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
