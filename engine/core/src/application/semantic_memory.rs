// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Semantic Memory
//!
//! Principle lifecycle and deduplication.
//!
//! `merge` is greedy online single-linkage: a candidate is compared only
//! against principles already committed, nearest neighbour first. At or above
//! the similarity threshold it reinforces that neighbour (support count and
//! provenance); below it becomes a new principle. Candidates from one
//! extraction are merged sequentially, so later ones see earlier ones.
//!
//! ## Consistency
//!
//! With [`ConsistencyMode::Optimistic`] the search runs under the partition
//! read lock and the commit under the write lock, separately. Two concurrent
//! merges on the same judge can therefore both miss each other and insert
//! near-duplicates. Such a pair persists until an `update_text` on either
//! of them folds it, or one is deleted.
//! [`ConsistencyMode::Serialized`] holds the partition's merge lock across
//! search and commit, which removes the race at the cost of merge throughput
//! per judge. Embedding always happens outside any lock.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::{debug, info};

use crate::application::memory_registry::{run_detached, JudgeMemory, MemoryRegistry};
use crate::domain::config::ConsistencyMode;
use crate::domain::error::{EntityKind, MemAlignError, MemAlignResult};
use crate::domain::evaluation::{MergeOutcome, UpdateOutcome};
use crate::domain::events::MemoryEvent;
use crate::domain::judge::Judge;
use crate::domain::memory::{ExampleId, Principle, PrincipleId};
use crate::domain::providers::EmbeddingProvider;
use crate::domain::repository::MemoryRepository;
use crate::infrastructure::event_bus::EventBus;

pub struct SemanticMemory {
    registry: Arc<MemoryRegistry>,
    repository: Arc<dyn MemoryRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    events: EventBus,
    similarity_threshold: f64,
    consistency: ConsistencyMode,
}

fn non_blank(text: &str) -> MemAlignResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(MemAlignError::validation("Principle text cannot be empty"));
    }
    Ok(trimmed.to_string())
}

impl SemanticMemory {
    pub fn new(
        registry: Arc<MemoryRegistry>,
        repository: Arc<dyn MemoryRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        events: EventBus,
        similarity_threshold: f64,
        consistency: ConsistencyMode,
    ) -> Self {
        Self {
            registry,
            repository,
            embedder,
            events,
            similarity_threshold,
            consistency,
        }
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    async fn exclusive(&self, partition: &JudgeMemory) -> Option<tokio::sync::OwnedMutexGuard<()>> {
        match self.consistency {
            ConsistencyMode::Serialized => Some(partition.merge_lock.clone().lock_owned().await),
            ConsistencyMode::Optimistic => None,
        }
    }

    /// Merge a candidate principle into the judge's semantic memory
    pub async fn merge(
        &self,
        judge: &Judge,
        candidate_text: &str,
        source: Option<ExampleId>,
    ) -> MemAlignResult<MergeOutcome> {
        let text = non_blank(candidate_text)?;
        let embedding = self.embedder.embed(&text).await?;
        let partition = self.registry.partition(judge).await?;
        let guard = self.exclusive(&partition).await;

        let nearest = partition
            .principles
            .read()
            .await
            .search(&embedding, 1)?
            .into_iter()
            .next()
            .filter(|h| h.similarity >= self.similarity_threshold)
            .map(|h| (h.id, h.similarity));

        let repository = self.repository.clone();
        let judge_name = judge.name.clone();
        let commit_partition = partition.clone();
        let committed = run_detached(async move {
            // Released only once the commit is done, even if the caller gave up
            let _guard = guard;
            let mut index = commit_partition.principles.write().await;
            commit_partition.ensure_live()?;

            if let Some((id, similarity)) = nearest {
                // Re-read under the write lock so concurrent reinforcements accumulate
                if let Some(current) = index.get(&id) {
                    let mut principle = current.clone();
                    principle.reinforce(source);
                    repository.save_principle(&principle).await?;
                    index.update_metadata(id, principle.clone());
                    return Ok::<_, MemAlignError>(MergeCommit::Reinforced { principle, similarity });
                }
                // The neighbour was deleted between search and commit
            }

            let principle = Principle::new(judge_name, text, embedding, source);
            let principle_id = principle.id;
            index.insert(principle_id, principle.embedding.clone(), principle.clone())?;
            if let Err(e) = repository.save_principle(&principle).await {
                index.delete(&principle_id);
                return Err(e.into());
            }
            Ok(MergeCommit::Discovered { principle_id })
        })
        .await?;

        match committed {
            MergeCommit::Reinforced { principle, similarity } => {
                debug!(
                    "Candidate reinforced principle {} of judge '{}' (similarity {:.4}, support {})",
                    principle.id, judge.name, similarity, principle.support_count
                );
                counter!("memalign_principles_reinforced_total", "judge" => judge.name.to_string())
                    .increment(1);
                self.events.publish(MemoryEvent::PrincipleReinforced {
                    judge_name: judge.name.clone(),
                    principle_id: principle.id,
                    similarity,
                    support_count: principle.support_count,
                    source_example_id: source,
                    timestamp: Utc::now(),
                });
                Ok(MergeOutcome {
                    principle_id: principle.id,
                    was_new: false,
                })
            }
            MergeCommit::Discovered { principle_id } => {
                info!("Discovered principle {} for judge '{}'", principle_id, judge.name);
                counter!("memalign_principles_created_total", "judge" => judge.name.to_string()).increment(1);
                self.events.publish(MemoryEvent::PrincipleDiscovered {
                    judge_name: judge.name.clone(),
                    principle_id,
                    source_example_id: source,
                    timestamp: Utc::now(),
                });
                Ok(MergeOutcome {
                    principle_id,
                    was_new: true,
                })
            }
        }
    }

    /// Replace a principle's text, re-embedding it and re-running the merge
    /// check against its siblings. A match folds the updated principle into
    /// the sibling and removes it, in one repository write.
    pub async fn update_text(
        &self,
        judge: &Judge,
        principle_id: PrincipleId,
        new_text: &str,
    ) -> MemAlignResult<UpdateOutcome> {
        let text = non_blank(new_text)?;
        let partition = self.registry.partition(judge).await?;
        if !partition.principles.read().await.contains(&principle_id) {
            return Err(MemAlignError::not_found(EntityKind::Principle, principle_id));
        }

        let embedding = self.embedder.embed(&text).await?;
        let guard = self.exclusive(&partition).await;

        let sibling = partition
            .principles
            .read()
            .await
            .search_filtered(&embedding, 1, |id| *id != principle_id)?
            .into_iter()
            .next()
            .filter(|h| h.similarity >= self.similarity_threshold)
            .map(|h| (h.id, h.similarity));

        let repository = self.repository.clone();
        let commit_partition = partition.clone();
        let outcome = run_detached(async move {
            let _guard = guard;
            let mut index = commit_partition.principles.write().await;
            commit_partition.ensure_live()?;
            let current = index
                .get(&principle_id)
                .cloned()
                .ok_or_else(|| MemAlignError::not_found(EntityKind::Principle, principle_id))?;

            if let Some(mut merged) = sibling.and_then(|(id, _)| index.get(&id).cloned()) {
                merged.absorb(&current);
                repository.merge_principles(&merged, principle_id).await?;
                let merged_into = merged.id;
                index.update_metadata(merged_into, merged);
                index.delete(&principle_id);
                return Ok::<_, MemAlignError>(UpdateOutcome::Merged {
                    removed_id: principle_id,
                    merged_into,
                });
            }

            let mut updated = current;
            updated.text = text;
            updated.embedding = embedding.clone();
            repository.save_principle(&updated).await?;
            index.update(principle_id, embedding, updated)?;
            Ok(UpdateOutcome::Updated { principle_id })
        })
        .await?;

        let timestamp = Utc::now();
        match outcome {
            UpdateOutcome::Updated { principle_id } => {
                info!("Updated principle {} of judge '{}'", principle_id, judge.name);
                self.events.publish(MemoryEvent::PrincipleUpdated {
                    judge_name: judge.name.clone(),
                    principle_id,
                    timestamp,
                });
            }
            UpdateOutcome::Merged { removed_id, merged_into } => {
                info!(
                    "Update merged principle {} into {} for judge '{}'",
                    removed_id, merged_into, judge.name
                );
                self.events.publish(MemoryEvent::PrincipleMerged {
                    judge_name: judge.name.clone(),
                    removed_id,
                    merged_into,
                    similarity: sibling.map(|(_, similarity)| similarity).unwrap_or_default(),
                    timestamp,
                });
            }
        }

        Ok(outcome)
    }

    pub async fn delete(&self, judge: &Judge, principle_id: PrincipleId) -> MemAlignResult<()> {
        let partition = self.registry.partition(judge).await?;
        let repository = self.repository.clone();
        let judge_name = judge.name.clone();

        let removed = run_detached(async move {
            let mut index = partition.principles.write().await;
            partition.ensure_live()?;
            if !index.contains(&principle_id) {
                return Ok::<_, MemAlignError>(false);
            }
            repository.delete_principle(&judge_name, principle_id).await?;
            index.delete(&principle_id);
            Ok(true)
        })
        .await?;

        if !removed {
            return Err(MemAlignError::not_found(EntityKind::Principle, principle_id));
        }

        info!("Deleted principle {} of judge '{}'", principle_id, judge.name);
        self.events.publish(MemoryEvent::PrincipleDeleted {
            judge_name: judge.name.clone(),
            principle_id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Every principle of the judge, in insertion order
    pub async fn list_all(&self, judge: &Judge) -> MemAlignResult<Vec<Principle>> {
        let partition = self.registry.partition(judge).await?;
        let index = partition.principles.read().await;
        Ok(index.values().cloned().collect())
    }

    pub async fn get(&self, judge: &Judge, principle_id: PrincipleId) -> MemAlignResult<Principle> {
        let partition = self.registry.partition(judge).await?;
        let index = partition.principles.read().await;
        index
            .get(&principle_id)
            .cloned()
            .ok_or_else(|| MemAlignError::not_found(EntityKind::Principle, principle_id))
    }

    pub async fn count(&self, judge: &Judge) -> MemAlignResult<usize> {
        let partition = self.registry.partition(judge).await?;
        let count = partition.principles.read().await.len();
        Ok(count)
    }
}

enum MergeCommit {
    Reinforced { principle: Principle, similarity: f64 },
    Discovered { principle_id: PrincipleId },
}
