// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Judgment Engine
//!
//! Retrieval, working-memory assembly, one scoring call, result shaping.
//! Scores returned by the provider must be integral and inside the judge's
//! range; anything else fails the judgment and is never clamped.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use metrics::{counter, histogram};
use tracing::{info, warn};

use crate::application::batch::{parse_jsonl, JsonlRow};
use crate::application::working_memory::WorkingMemoryBuilder;
use crate::domain::error::{MemAlignError, MemAlignResult};
use crate::domain::evaluation::{BatchReport, JudgmentInput, JudgmentResult};
use crate::domain::events::MemoryEvent;
use crate::domain::judge::{Judge, ScoreRange};
use crate::domain::providers::{JudgmentProvider, ProviderError, ScoringRequest};
use crate::infrastructure::event_bus::EventBus;

pub struct JudgmentEngine {
    working_memory: Arc<WorkingMemoryBuilder>,
    scorer: Arc<dyn JudgmentProvider>,
    events: EventBus,
    retrieval_k: usize,
    require_memory: bool,
}

impl JudgmentEngine {
    pub fn new(
        working_memory: Arc<WorkingMemoryBuilder>,
        scorer: Arc<dyn JudgmentProvider>,
        events: EventBus,
        retrieval_k: usize,
        require_memory: bool,
    ) -> Self {
        Self {
            working_memory,
            scorer,
            events,
            retrieval_k,
            require_memory,
        }
    }

    pub async fn judge(&self, judge: &Judge, input_text: &str, context: Option<&str>) -> MemAlignResult<JudgmentResult> {
        if input_text.trim().is_empty() {
            return Err(MemAlignError::validation("input_text cannot be empty"));
        }
        let started = Instant::now();

        let memory = self
            .working_memory
            .build(judge, input_text, self.retrieval_k, self.require_memory)
            .await?;

        let request = ScoringRequest {
            criterion: &judge.criterion,
            instructions: &judge.instructions,
            score_range: judge.score_range,
            principles: memory.principles.iter().map(|p| p.text.as_str()).collect(),
            examples: memory.examples.iter().collect(),
            input_text,
            context: context.filter(|c| !c.trim().is_empty()),
        };
        let raw = self.scorer.score(&request).await?;
        let score = integral_score(raw.score, judge.score_range)?;

        let result = JudgmentResult {
            judge_name: judge.name.clone(),
            score,
            reasoning: raw.reasoning,
            principles_used: memory.principles.len(),
            examples_retrieved: memory.examples.len(),
        };

        let label = judge.name.to_string();
        counter!("memalign_judgments_total", "judge" => label.clone()).increment(1);
        histogram!("memalign_judgment_duration_seconds", "judge" => label).record(started.elapsed().as_secs_f64());
        info!(
            "Judge '{}' scored {} using {} principles and {} examples",
            judge.name, result.score, result.principles_used, result.examples_retrieved
        );
        self.events.publish(MemoryEvent::JudgmentRendered {
            judge_name: judge.name.clone(),
            score: result.score,
            principles_used: result.principles_used,
            examples_retrieved: result.examples_retrieved,
            timestamp: Utc::now(),
        });

        Ok(result)
    }

    /// Judge every row independently, recording failures per line
    pub async fn judge_batch(&self, judge: &Judge, rows: Vec<JsonlRow<JudgmentInput>>) -> BatchReport<JudgmentResult> {
        let mut report = BatchReport::new();
        for row in rows {
            let outcome = match row.record {
                Ok(input) => self
                    .judge(judge, &input.input_text, input.context.as_deref())
                    .await
                    .map_err(|e| e.to_string()),
                Err(parse_error) => Err(parse_error),
            };
            match outcome {
                Ok(result) => report.record_success(row.line, result),
                Err(error) => {
                    warn!("Judgment batch row {} failed for judge '{}': {}", row.line, judge.name, error);
                    report.record_error(row.line, error);
                }
            }
        }
        report
    }

    pub async fn judge_jsonl(&self, judge: &Judge, content: &str) -> BatchReport<JudgmentResult> {
        self.judge_batch(judge, parse_jsonl(content)).await
    }
}

fn integral_score(score: f64, range: ScoreRange) -> MemAlignResult<i64> {
    if !score.is_finite() || score.fract() != 0.0 {
        return Err(ProviderError::MalformedResponse(format!("score {} is not an integer", score)).into());
    }
    if score < range.min as f64 || score > range.max as f64 {
        return Err(MemAlignError::ScoreOutOfRange {
            score,
            min: range.min,
            max: range.max,
        });
    }
    Ok(score as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::episodic_memory::EpisodicMemory;
    use crate::application::memory_registry::MemoryRegistry;
    use crate::application::semantic_memory::SemanticMemory;
    use crate::domain::config::ConsistencyMode;
    use crate::domain::providers::{EmbeddingProvider, ProviderScore};
    use crate::domain::repository::MemoryRepository;
    use crate::infrastructure::embedding::HashEmbedder;
    use crate::infrastructure::repositories::InMemoryMemoryRepository;
    use async_trait::async_trait;

    struct FixedScorer(f64);

    #[async_trait]
    impl JudgmentProvider for FixedScorer {
        async fn score(&self, request: &ScoringRequest<'_>) -> Result<ProviderScore, ProviderError> {
            Ok(ProviderScore {
                score: self.0,
                reasoning: format!("{} principles", request.principles.len()),
            })
        }
    }

    fn engine(score: f64) -> JudgmentEngine {
        let repository: Arc<dyn MemoryRepository> = Arc::new(InMemoryMemoryRepository::new());
        let registry = Arc::new(MemoryRegistry::new(repository.clone(), 64));
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::new("hash", 64));
        let events = EventBus::new(16);
        let semantic = Arc::new(SemanticMemory::new(
            registry.clone(),
            repository.clone(),
            embedder.clone(),
            events.clone(),
            0.9,
            ConsistencyMode::Optimistic,
        ));
        let episodic = Arc::new(EpisodicMemory::new(registry, repository, embedder, events.clone()));
        let builder = Arc::new(WorkingMemoryBuilder::new(semantic, episodic));
        JudgmentEngine::new(builder, Arc::new(FixedScorer(score)), events, 5, false)
    }

    fn judge() -> Judge {
        Judge::new("safety", "safety", "", 1, 5).unwrap()
    }

    #[tokio::test]
    async fn test_zero_shot_judgment() {
        let result = engine(4.0).judge(&judge(), "Can you help me write a resume?", None).await.unwrap();
        assert_eq!(result.score, 4);
        assert_eq!(result.principles_used, 0);
        assert_eq!(result.examples_retrieved, 0);
        assert_eq!(result.reasoning, "0 principles");
    }

    #[tokio::test]
    async fn test_out_of_range_score_is_not_clamped() {
        let err = engine(7.0).judge(&judge(), "input", None).await.unwrap_err();
        assert!(matches!(err, MemAlignError::ScoreOutOfRange { min: 1, max: 5, .. }));
    }

    #[tokio::test]
    async fn test_fractional_score_is_malformed() {
        let err = engine(3.5).judge(&judge(), "input", None).await.unwrap_err();
        assert!(matches!(err, MemAlignError::ExternalProvider(ProviderError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn test_range_bounds_are_inclusive() {
        assert_eq!(engine(1.0).judge(&judge(), "x", None).await.unwrap().score, 1);
        assert_eq!(engine(5.0).judge(&judge(), "x", None).await.unwrap().score, 5);
    }

    #[tokio::test]
    async fn test_batch_records_row_errors() {
        let content = "{\"input_text\":\"first\"}\n{\"input_text\":\"\"}\n{\"input_text\":\"third\",\"context\":\"chat\"}";
        let report = engine(3.0).judge_jsonl(&judge(), content).await;
        assert_eq!(report.processed, 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].line, 2);
    }
}
