// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Episodic Memory
//!
//! Example lifecycle and top-k retrieval. Examples are never deduplicated:
//! near-identical inputs with different expert scores are all kept and all
//! retrievable.

use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use tracing::info;

use crate::application::memory_registry::{run_detached, MemoryRegistry};
use crate::domain::error::{EntityKind, MemAlignError, MemAlignResult};
use crate::domain::events::MemoryEvent;
use crate::domain::judge::Judge;
use crate::domain::memory::{Example, ExampleId, FeedbackInput};
use crate::domain::providers::EmbeddingProvider;
use crate::domain::repository::MemoryRepository;
use crate::infrastructure::event_bus::EventBus;

/// Rejects blank text and scores outside the judge's range
pub fn validate_feedback(judge: &Judge, feedback: &FeedbackInput) -> MemAlignResult<()> {
    if feedback.input_text.trim().is_empty() {
        return Err(MemAlignError::validation("input_text cannot be empty"));
    }
    if feedback.expert_feedback.trim().is_empty() {
        return Err(MemAlignError::validation("expert_feedback cannot be empty"));
    }
    judge.score_range.check("expert_score", feedback.expert_score)?;
    if let Some(judge_score) = feedback.judge_score {
        judge.score_range.check("judge_score", judge_score)?;
    }
    Ok(())
}

pub struct EpisodicMemory {
    registry: Arc<MemoryRegistry>,
    repository: Arc<dyn MemoryRepository>,
    embedder: Arc<dyn EmbeddingProvider>,
    events: EventBus,
}

impl EpisodicMemory {
    pub fn new(
        registry: Arc<MemoryRegistry>,
        repository: Arc<dyn MemoryRepository>,
        embedder: Arc<dyn EmbeddingProvider>,
        events: EventBus,
    ) -> Self {
        Self {
            registry,
            repository,
            embedder,
            events,
        }
    }

    /// Validate, embed and persist one piece of feedback
    pub async fn store(&self, judge: &Judge, feedback: FeedbackInput) -> MemAlignResult<Example> {
        validate_feedback(judge, &feedback)?;

        let embedding = self.embedder.embed(&feedback.input_text).await?;
        let partition = self.registry.partition(judge).await?;
        let example = Example::new(judge.name.clone(), feedback, embedding);

        let repository = self.repository.clone();
        let record = example.clone();
        run_detached(async move {
            let mut index = partition.examples.write().await;
            partition.ensure_live()?;
            let example_id = record.id;
            index.insert(example_id, record.embedding.clone(), record.clone())?;
            if let Err(e) = repository.save_example(&record).await {
                index.delete(&example_id);
                return Err(e.into());
            }
            Ok::<_, MemAlignError>(())
        })
        .await?;

        info!("Stored example {} for judge '{}'", example.id, judge.name);
        counter!("memalign_examples_stored_total", "judge" => judge.name.to_string()).increment(1);
        self.events.publish(MemoryEvent::ExampleStored {
            judge_name: judge.name.clone(),
            example_id: example.id,
            expert_score: example.expert_score,
            timestamp: Utc::now(),
        });

        Ok(example)
    }

    /// Top-k examples by descending similarity of their input to `query_text`
    pub async fn retrieve(&self, judge: &Judge, query_text: &str, k: usize) -> MemAlignResult<Vec<Example>> {
        Ok(self
            .retrieve_scored(judge, query_text, k)
            .await?
            .into_iter()
            .map(|(example, _)| example)
            .collect())
    }

    /// `retrieve`, keeping each example's similarity
    pub async fn retrieve_scored(
        &self,
        judge: &Judge,
        query_text: &str,
        k: usize,
    ) -> MemAlignResult<Vec<(Example, f64)>> {
        let partition = self.registry.partition(judge).await?;
        if k == 0 || partition.examples.read().await.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(query_text).await?;
        let hits = partition.examples.read().await.search(&query, k)?;
        Ok(hits.into_iter().map(|hit| (hit.metadata, hit.similarity)).collect())
    }

    /// Introspection: similarity search when a query is given, otherwise the
    /// first `limit` examples in insertion order
    pub async fn list_or_search(
        &self,
        judge: &Judge,
        query_text: Option<&str>,
        limit: usize,
    ) -> MemAlignResult<Vec<Example>> {
        match query_text.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => self.retrieve(judge, query, limit).await,
            None => {
                let partition = self.registry.partition(judge).await?;
                let index = partition.examples.read().await;
                Ok(index.values().take(limit).cloned().collect())
            }
        }
    }

    pub async fn all(&self, judge: &Judge) -> MemAlignResult<Vec<Example>> {
        let partition = self.registry.partition(judge).await?;
        let index = partition.examples.read().await;
        Ok(index.values().cloned().collect())
    }

    pub async fn delete(&self, judge: &Judge, example_id: ExampleId) -> MemAlignResult<()> {
        let partition = self.registry.partition(judge).await?;
        let repository = self.repository.clone();
        let judge_name = judge.name.clone();

        let removed = run_detached(async move {
            let mut index = partition.examples.write().await;
            partition.ensure_live()?;
            if !index.contains(&example_id) {
                return Ok::<_, MemAlignError>(false);
            }
            repository.delete_example(&judge_name, example_id).await?;
            index.delete(&example_id);
            Ok(true)
        })
        .await?;

        if !removed {
            return Err(MemAlignError::not_found(EntityKind::Example, example_id));
        }

        info!("Deleted example {} of judge '{}'", example_id, judge.name);
        self.events.publish(MemoryEvent::ExampleDeleted {
            judge_name: judge.name.clone(),
            example_id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub async fn count(&self, judge: &Judge) -> MemAlignResult<usize> {
        let partition = self.registry.partition(judge).await?;
        let count = partition.examples.read().await.len();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::embedding::HashEmbedder;
    use crate::infrastructure::repositories::InMemoryMemoryRepository;

    fn episodic() -> (EpisodicMemory, Judge) {
        let repository: Arc<dyn MemoryRepository> = Arc::new(InMemoryMemoryRepository::new());
        let registry = Arc::new(MemoryRegistry::new(repository.clone(), 128));
        let memory = EpisodicMemory::new(
            registry,
            repository,
            Arc::new(HashEmbedder::new("hash", 128)),
            EventBus::new(16),
        );
        (memory, Judge::new("safety", "safety", "", 1, 5).unwrap())
    }

    #[tokio::test]
    async fn test_out_of_range_score_stores_nothing() {
        let (memory, judge) = episodic();
        let err = memory
            .store(&judge, FeedbackInput::new("input", "feedback", 6))
            .await
            .unwrap_err();
        assert!(matches!(err, MemAlignError::Validation(_)));

        let err = memory
            .store(&judge, FeedbackInput::new("input", "feedback", 3).with_judge_attempt("out", Some(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, MemAlignError::Validation(_)));
        assert_eq!(memory.count(&judge).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_near_identical_inputs_are_all_kept() {
        let (memory, judge) = episodic();
        memory.store(&judge, FeedbackInput::new("pick a lock", "unsafe", 1)).await.unwrap();
        memory.store(&judge, FeedbackInput::new("pick a lock", "fine for locksmiths", 4)).await.unwrap();

        let retrieved = memory.retrieve(&judge, "pick a lock", 10).await.unwrap();
        assert_eq!(retrieved.len(), 2);
        // Equal similarity keeps insertion order
        assert_eq!(retrieved[0].expert_score, 1);
    }

    #[tokio::test]
    async fn test_retrieve_orders_by_similarity() {
        let (memory, judge) = episodic();
        memory.store(&judge, FeedbackInput::new("banana bread recipe", "fine", 5)).await.unwrap();
        memory.store(&judge, FeedbackInput::new("how to pick a lock quickly", "unsafe", 1)).await.unwrap();

        let scored = memory.retrieve_scored(&judge, "pick a lock", 2).await.unwrap();
        assert_eq!(scored[0].0.input_text, "how to pick a lock quickly");
        assert!(scored[0].1 >= scored[1].1);

        let top = memory.retrieve(&judge, "pick a lock", 1).await.unwrap();
        assert_eq!(top.len(), 1);
    }

    #[tokio::test]
    async fn test_list_without_query_respects_limit() {
        let (memory, judge) = episodic();
        for i in 0..3 {
            memory
                .store(&judge, FeedbackInput::new(format!("input {}", i), "feedback", 3))
                .await
                .unwrap();
        }
        let listed = memory.list_or_search(&judge, None, 2).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].input_text, "input 0");
    }

    #[tokio::test]
    async fn test_delete_unknown_example_is_not_found() {
        let (memory, judge) = episodic();
        let err = memory.delete(&judge, ExampleId::new()).await.unwrap_err();
        assert!(matches!(err, MemAlignError::NotFound { kind: EntityKind::Example, .. }));
    }
}
