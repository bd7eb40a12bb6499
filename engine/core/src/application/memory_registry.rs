// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Judge Memory Registry
//!
//! Process-wide registry of per-judge memory partitions. Each partition owns
//! two vector indices (semantic and episodic) whose metadata is the full
//! record, so reads never touch the repository.
//!
//! Lifecycle: a partition is created on first access (hydrated from the
//! repository, records ordered by `(created_at, id)`) or by `create_judge`.
//! `delete_judge` retires it: the retired flag is set while both index write
//! locks are held, and the retired partition stays registered as a tombstone
//! until the name is created again. A partition belongs to one incarnation of
//! a judge (its `created_at`); a caller holding a stale or deleted `Judge`
//! gets `NotFound` instead of a partition. Partitions of different judges
//! share no locks.
//!
//! Mutations run through [`run_detached`]: the repository write and the index
//! update execute on their own task, so dropping the caller's future (for
//! example on timeout) cannot leave a record written to one but not the other.
//! Every commit calls [`JudgeMemory::ensure_live`] under the index write lock.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::domain::error::{EntityKind, MemAlignError, MemAlignResult};
use crate::domain::judge::{Judge, JudgeName};
use crate::domain::memory::{Example, ExampleId, Principle, PrincipleId};
use crate::domain::repository::MemoryRepository;
use crate::infrastructure::vector_index::VectorIndex;

pub type PrincipleIndex = VectorIndex<PrincipleId, Principle>;
pub type ExampleIndex = VectorIndex<ExampleId, Example>;

/// One judge's in-memory partition
#[derive(Debug)]
pub struct JudgeMemory {
    pub judge_name: JudgeName,
    /// `created_at` of the judge incarnation this partition belongs to
    pub judge_created_at: DateTime<Utc>,
    pub principles: Arc<RwLock<PrincipleIndex>>,
    pub examples: Arc<RwLock<ExampleIndex>>,
    /// Held across search and commit when merges are serialized
    pub merge_lock: Arc<Mutex<()>>,
    retired: AtomicBool,
}

impl JudgeMemory {
    pub fn empty(judge: &Judge, dimension: usize) -> Self {
        Self::from_indices(judge, VectorIndex::new(dimension), VectorIndex::new(dimension))
    }

    fn from_indices(judge: &Judge, principles: PrincipleIndex, examples: ExampleIndex) -> Self {
        Self {
            judge_name: judge.name.clone(),
            judge_created_at: judge.created_at,
            principles: Arc::new(RwLock::new(principles)),
            examples: Arc::new(RwLock::new(examples)),
            merge_lock: Arc::new(Mutex::new(())),
            retired: AtomicBool::new(false),
        }
    }

    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Fails once the judge has been deleted
    pub fn ensure_live(&self) -> MemAlignResult<()> {
        if self.is_retired() {
            return Err(MemAlignError::not_found(EntityKind::Judge, &self.judge_name));
        }
        Ok(())
    }

    fn belongs_to(&self, judge: &Judge) -> bool {
        !self.is_retired() && self.judge_created_at == judge.created_at
    }

    /// Mark retired and drop the in-memory records. Waits for in-flight
    /// commits, which hold the index write locks.
    async fn retire(&self) {
        let mut principles = self.principles.write().await;
        let mut examples = self.examples.write().await;
        self.retired.store(true, Ordering::Release);
        let dimension = principles.dimension();
        *principles = VectorIndex::new(dimension);
        *examples = VectorIndex::new(dimension);
    }
}

pub struct MemoryRegistry {
    partitions: DashMap<JudgeName, Arc<JudgeMemory>>,
    repository: Arc<dyn MemoryRepository>,
    dimension: usize,
}

impl MemoryRegistry {
    pub fn new(repository: Arc<dyn MemoryRepository>, dimension: usize) -> Self {
        Self {
            partitions: DashMap::new(),
            repository,
            dimension,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Partition for a judge, hydrating it from the repository on first access
    pub async fn partition(&self, judge: &Judge) -> MemAlignResult<Arc<JudgeMemory>> {
        let existing = self.partitions.get(&judge.name).map(|entry| entry.clone());
        let partition = match existing {
            Some(partition) => partition,
            None => {
                let hydrated = self.hydrate(judge).await?;
                // A concurrent hydration or retirement may have won; keep whichever was registered first
                self.partitions
                    .entry(judge.name.clone())
                    .or_insert_with(|| Arc::new(hydrated))
                    .clone()
            }
        };

        if !partition.belongs_to(judge) {
            return Err(MemAlignError::not_found(EntityKind::Judge, &judge.name));
        }
        Ok(partition)
    }

    /// Register an empty partition for a newly created judge, replacing any
    /// tombstone left by an earlier judge of the same name
    pub fn register_empty(&self, judge: &Judge) {
        let fresh = Arc::new(JudgeMemory::empty(judge, self.dimension));
        if self.partitions.insert(judge.name.clone(), fresh).is_some() {
            debug!("Replaced stale memory partition for judge '{}'", judge.name);
        }
    }

    /// Tear down a judge's partition. In-flight operations holding it fail
    /// with `NotFound` on their next commit.
    pub async fn retire(&self, judge: &Judge) {
        let partition = self
            .partitions
            .entry(judge.name.clone())
            .or_insert_with(|| Arc::new(JudgeMemory::empty(judge, self.dimension)))
            .clone();
        partition.retire().await;
        debug!("Retired memory partition for judge '{}'", judge.name);
    }

    /// Drop whatever is registered for a name; the next access re-hydrates
    pub fn forget(&self, judge_name: &JudgeName) {
        self.partitions.remove(judge_name);
    }

    pub fn is_loaded(&self, judge_name: &JudgeName) -> bool {
        self.partitions
            .get(judge_name)
            .map(|partition| !partition.is_retired())
            .unwrap_or(false)
    }

    async fn hydrate(&self, judge: &Judge) -> MemAlignResult<JudgeMemory> {
        let judge_name = &judge.name;
        let principles = self.repository.load_principles(judge_name).await?;
        let examples = self.repository.load_examples(judge_name).await?;

        let mut principle_index = VectorIndex::new(self.dimension);
        for principle in principles {
            let id = principle.id;
            if let Err(e) = principle_index.insert(id, principle.embedding.clone(), principle) {
                warn!("Skipping principle {} of judge '{}': {}", id, judge_name, e);
            }
        }

        let mut example_index = VectorIndex::new(self.dimension);
        for example in examples {
            let id = example.id;
            if let Err(e) = example_index.insert(id, example.embedding.clone(), example) {
                warn!("Skipping example {} of judge '{}': {}", id, judge_name, e);
            }
        }

        info!(
            "Hydrated memory for judge '{}' ({} principles, {} examples)",
            judge_name,
            principle_index.len(),
            example_index.len()
        );

        Ok(JudgeMemory::from_indices(judge, principle_index, example_index))
    }
}

/// Run a commit on its own task and wait for it
pub async fn run_detached<T, F>(commit: F) -> MemAlignResult<T>
where
    F: Future<Output = MemAlignResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(commit)
        .await
        .map_err(|e| MemAlignError::Internal(format!("Memory commit task failed: {}", e)))?
}
