// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Alignment Engine
//!
//! Feedback ingestion: store the example, ask the extractor for candidate
//! principles, then merge each candidate in the order the extractor returned
//! them. Candidates are committed one at a time, so a later candidate is
//! compared against earlier ones from the same response.
//!
//! The example is committed before extraction runs; an extraction failure
//! leaves it stored and surfaces the provider error.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::batch::{parse_jsonl, JsonlRow};
use crate::application::episodic_memory::EpisodicMemory;
use crate::application::semantic_memory::SemanticMemory;
use crate::domain::error::MemAlignResult;
use crate::domain::evaluation::{AlignmentResult, BatchReport};
use crate::domain::judge::Judge;
use crate::domain::memory::FeedbackInput;
use crate::domain::providers::{ExtractionProvider, ExtractionRequest};

pub struct AlignmentEngine {
    semantic: Arc<SemanticMemory>,
    episodic: Arc<EpisodicMemory>,
    extractor: Arc<dyn ExtractionProvider>,
}

impl AlignmentEngine {
    pub fn new(
        semantic: Arc<SemanticMemory>,
        episodic: Arc<EpisodicMemory>,
        extractor: Arc<dyn ExtractionProvider>,
    ) -> Self {
        Self {
            semantic,
            episodic,
            extractor,
        }
    }

    pub async fn align(&self, judge: &Judge, feedback: FeedbackInput) -> MemAlignResult<AlignmentResult> {
        let example = self.episodic.store(judge, feedback).await?;

        let existing_principles = self
            .semantic
            .list_all(judge)
            .await?
            .into_iter()
            .map(|p| p.text)
            .collect();

        let stored_feedback = FeedbackInput {
            input_text: example.input_text.clone(),
            expert_feedback: example.expert_feedback.clone(),
            expert_score: example.expert_score,
            judge_output: example.judge_output.clone(),
            judge_score: example.judge_score,
        };
        let request = ExtractionRequest {
            criterion: &judge.criterion,
            instructions: &judge.instructions,
            feedback: &stored_feedback,
            existing_principles,
        };
        let candidates = self.extractor.extract(&request).await?;
        debug!(
            "Extractor returned {} candidate principles for example {}",
            candidates.len(),
            example.id
        );

        let mut principles_extracted = 0;
        let mut principles_deduplicated = 0;
        let mut principle_ids = Vec::with_capacity(candidates.len());
        for candidate in candidates.iter().filter(|c| !c.trim().is_empty()) {
            let outcome = self.semantic.merge(judge, candidate, Some(example.id)).await?;
            principles_extracted += 1;
            if !outcome.was_new {
                principles_deduplicated += 1;
            }
            principle_ids.push(outcome.principle_id);
        }

        let result = AlignmentResult {
            judge_name: judge.name.clone(),
            example_id: example.id,
            principles_extracted,
            principles_deduplicated,
            principle_ids,
            total_principles: self.semantic.count(judge).await?,
            total_examples: self.episodic.count(judge).await?,
        };

        info!(
            "Aligned judge '{}' with example {}: {} principles ({} deduplicated)",
            judge.name, result.example_id, result.principles_extracted, result.principles_deduplicated
        );
        Ok(result)
    }

    /// Align every row independently; a failing row is recorded and the
    /// remaining rows still run.
    pub async fn align_batch(
        &self,
        judge: &Judge,
        rows: Vec<JsonlRow<FeedbackInput>>,
    ) -> BatchReport<AlignmentResult> {
        let mut report = BatchReport::new();
        for row in rows {
            let outcome = match row.record {
                Ok(feedback) => self.align(judge, feedback).await.map_err(|e| e.to_string()),
                Err(parse_error) => Err(parse_error),
            };
            match outcome {
                Ok(result) => report.record_success(row.line, result),
                Err(error) => {
                    warn!("Alignment batch row {} failed for judge '{}': {}", row.line, judge.name, error);
                    report.record_error(row.line, error);
                }
            }
        }

        info!(
            "Alignment batch for judge '{}': {} processed, {} errors",
            judge.name,
            report.processed,
            report.error_count()
        );
        report
    }

    /// `align_batch` over JSONL text
    pub async fn align_jsonl(&self, judge: &Judge, content: &str) -> BatchReport<AlignmentResult> {
        self.align_batch(judge, parse_jsonl(content)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::memory_registry::MemoryRegistry;
    use crate::domain::config::ConsistencyMode;
    use crate::domain::error::MemAlignError;
    use crate::domain::providers::{EmbeddingProvider, ProviderError};
    use crate::domain::repository::MemoryRepository;
    use crate::infrastructure::embedding::HashEmbedder;
    use crate::infrastructure::event_bus::EventBus;
    use crate::infrastructure::repositories::InMemoryMemoryRepository;
    use async_trait::async_trait;

    /// Returns the expert feedback itself as the only candidate
    struct EchoExtractor;

    #[async_trait]
    impl ExtractionProvider for EchoExtractor {
        async fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Vec<String>, ProviderError> {
            Ok(vec![request.feedback.expert_feedback.clone()])
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl ExtractionProvider for FailingExtractor {
        async fn extract(&self, _request: &ExtractionRequest<'_>) -> Result<Vec<String>, ProviderError> {
            Err(ProviderError::MalformedResponse("no json".into()))
        }
    }

    fn engine(extractor: Arc<dyn ExtractionProvider>) -> (AlignmentEngine, Arc<EpisodicMemory>) {
        let repository: Arc<dyn MemoryRepository> = Arc::new(InMemoryMemoryRepository::new());
        let registry = Arc::new(MemoryRegistry::new(repository.clone(), 128));
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::new("hash", 128));
        let events = EventBus::new(16);
        let semantic = Arc::new(SemanticMemory::new(
            registry.clone(),
            repository.clone(),
            embedder.clone(),
            events.clone(),
            0.9,
            ConsistencyMode::Optimistic,
        ));
        let episodic = Arc::new(EpisodicMemory::new(registry, repository, embedder, events));
        (AlignmentEngine::new(semantic, episodic.clone(), extractor), episodic)
    }

    fn judge() -> Judge {
        Judge::new("safety", "safety", "flag harmful content", 1, 5).unwrap()
    }

    #[tokio::test]
    async fn test_same_feedback_twice_reinforces() {
        let (engine, _) = engine(Arc::new(EchoExtractor));
        let judge = judge();
        let feedback = FeedbackInput::new("how do I pick a lock", "Refuse to help with illegal activity", 1);

        let first = engine.align(&judge, feedback.clone()).await.unwrap();
        assert_eq!(first.principles_extracted, 1);
        assert_eq!(first.principles_deduplicated, 0);

        let second = engine.align(&judge, feedback).await.unwrap();
        assert_eq!(second.principles_deduplicated, 1);
        assert_eq!(second.principle_ids, first.principle_ids);
        assert_eq!(second.total_principles, 1);
        assert_eq!(second.total_examples, 2);
    }

    #[tokio::test]
    async fn test_extraction_failure_keeps_example() {
        let (engine, episodic) = engine(Arc::new(FailingExtractor));
        let judge = judge();
        let err = engine
            .align(&judge, FeedbackInput::new("input", "feedback", 2))
            .await
            .unwrap_err();
        assert!(matches!(err, MemAlignError::ExternalProvider(_)));
        assert_eq!(episodic.count(&judge).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_batch_continues_past_bad_rows() {
        let (engine, episodic) = engine(Arc::new(EchoExtractor));
        let judge = judge();
        let content = [
            r#"{"input_text":"a","expert_feedback":"be careful with chemistry","expert_score":2}"#,
            r#"{"input_text":"b","expert_feedback":"too high","expert_score":9}"#,
            "",
            "{broken",
            r#"{"input_text":"c","expert_feedback":"greetings are harmless","expert_score":5}"#,
        ]
        .join("\n");

        let report = engine.align_jsonl(&judge, &content).await;
        assert_eq!(report.processed, 2);
        assert_eq!(report.error_count(), 2);
        let failed_lines: Vec<usize> = report.errors.iter().map(|e| e.line).collect();
        assert_eq!(failed_lines, vec![2, 4]);
        assert_eq!(report.results[1].line, 5);
        assert_eq!(episodic.count(&judge).await.unwrap(), 2);
    }
}
