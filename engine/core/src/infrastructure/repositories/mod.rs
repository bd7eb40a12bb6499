// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository traits defined in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve judges, principles and examples
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! # Available Implementations
//!
//! - **SledStore** - embedded key-value store under `data_dir`; survives restarts
//! - **InMemoryJudgeRepository** / **InMemoryMemoryRepository** - HashMap-backed,
//!   for tests and throwaway sessions
//!
//! Memory records are returned ordered by `(created_at, id)`, which is the
//! order the vector index is rebuilt in.

pub mod sled_store;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::judge::{Judge, JudgeName};
use crate::domain::memory::{Example, ExampleId, Principle, PrincipleId};
use crate::domain::repository::{JudgeRepository, MemoryRepository, RepositoryError};

pub use sled_store::SledStore;

fn poisoned<T>(_: T) -> RepositoryError {
    RepositoryError::Unknown("repository lock poisoned".to_string())
}

/// Sort memory records into index rebuild order
pub(crate) fn sort_principles(principles: &mut [Principle]) {
    principles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

pub(crate) fn sort_examples(examples: &mut [Example]) {
    examples.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

#[derive(Clone, Default)]
pub struct InMemoryJudgeRepository {
    judges: Arc<RwLock<HashMap<JudgeName, Judge>>>,
}

impl InMemoryJudgeRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JudgeRepository for InMemoryJudgeRepository {
    async fn save(&self, judge: &Judge) -> Result<(), RepositoryError> {
        let mut judges = self.judges.write().map_err(poisoned)?;
        judges.insert(judge.name.clone(), judge.clone());
        Ok(())
    }

    async fn find_by_name(&self, name: &JudgeName) -> Result<Option<Judge>, RepositoryError> {
        let judges = self.judges.read().map_err(poisoned)?;
        Ok(judges.get(name).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Judge>, RepositoryError> {
        let judges = self.judges.read().map_err(poisoned)?;
        let mut all: Vec<Judge> = judges.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn delete(&self, name: &JudgeName) -> Result<bool, RepositoryError> {
        let mut judges = self.judges.write().map_err(poisoned)?;
        Ok(judges.remove(name).is_some())
    }
}

#[derive(Default)]
struct JudgeRecords {
    principles: HashMap<PrincipleId, Principle>,
    examples: HashMap<ExampleId, Example>,
}

#[derive(Clone, Default)]
pub struct InMemoryMemoryRepository {
    records: Arc<RwLock<HashMap<JudgeName, JudgeRecords>>>,
}

impl InMemoryMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryRepository for InMemoryMemoryRepository {
    async fn save_principle(&self, principle: &Principle) -> Result<(), RepositoryError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records
            .entry(principle.judge_name.clone())
            .or_default()
            .principles
            .insert(principle.id, principle.clone());
        Ok(())
    }

    async fn delete_principle(&self, judge: &JudgeName, id: PrincipleId) -> Result<(), RepositoryError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if let Some(judge_records) = records.get_mut(judge) {
            judge_records.principles.remove(&id);
        }
        Ok(())
    }

    async fn load_principles(&self, judge: &JudgeName) -> Result<Vec<Principle>, RepositoryError> {
        let records = self.records.read().map_err(poisoned)?;
        let mut principles: Vec<Principle> = records
            .get(judge)
            .map(|r| r.principles.values().cloned().collect())
            .unwrap_or_default();
        sort_principles(&mut principles);
        Ok(principles)
    }

    async fn merge_principles(&self, survivor: &Principle, removed: PrincipleId) -> Result<(), RepositoryError> {
        let mut records = self.records.write().map_err(poisoned)?;
        let judge_records = records.entry(survivor.judge_name.clone()).or_default();
        judge_records.principles.insert(survivor.id, survivor.clone());
        judge_records.principles.remove(&removed);
        Ok(())
    }

    async fn save_example(&self, example: &Example) -> Result<(), RepositoryError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records
            .entry(example.judge_name.clone())
            .or_default()
            .examples
            .insert(example.id, example.clone());
        Ok(())
    }

    async fn delete_example(&self, judge: &JudgeName, id: ExampleId) -> Result<(), RepositoryError> {
        let mut records = self.records.write().map_err(poisoned)?;
        if let Some(judge_records) = records.get_mut(judge) {
            judge_records.examples.remove(&id);
        }
        Ok(())
    }

    async fn load_examples(&self, judge: &JudgeName) -> Result<Vec<Example>, RepositoryError> {
        let records = self.records.read().map_err(poisoned)?;
        let mut examples: Vec<Example> = records
            .get(judge)
            .map(|r| r.examples.values().cloned().collect())
            .unwrap_or_default();
        sort_examples(&mut examples);
        Ok(examples)
    }

    async fn purge_judge(&self, judge: &JudgeName) -> Result<(), RepositoryError> {
        let mut records = self.records.write().map_err(poisoned)?;
        records.remove(judge);
        Ok(())
    }
}
