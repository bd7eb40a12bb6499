// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # MemAlign Service
//!
//! The operation surface consumed by the CLI and the HTTP API. Every
//! operation resolves the judge first, so unknown names fail with
//! `NotFound` before any memory partition is touched.
//!
//! Judge creation and deletion are serialized against each other; memory
//! operations on different judges never contend.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::info;

use crate::application::alignment::AlignmentEngine;
use crate::application::episodic_memory::EpisodicMemory;
use crate::application::judgment::JudgmentEngine;
use crate::application::memory_registry::MemoryRegistry;
use crate::application::repository_factory::{create_repositories, Repositories};
use crate::application::semantic_memory::SemanticMemory;
use crate::application::working_memory::WorkingMemoryBuilder;
use crate::domain::config::MemAlignConfig;
use crate::domain::error::{EntityKind, MemAlignError, MemAlignResult};
use crate::domain::evaluation::{AlignmentResult, BatchReport, InteractiveEvaluation, JudgmentResult, UpdateOutcome};
use crate::domain::events::MemoryEvent;
use crate::domain::judge::{Judge, JudgeName};
use crate::domain::memory::{Example, ExampleId, FeedbackInput, MemoryStats, Principle, PrincipleId};
use crate::domain::providers::{EmbeddingProvider, ExtractionProvider, JudgmentProvider};
use crate::domain::repository::{JudgeRepository, MemoryRepository};
use crate::infrastructure::embedding::build_embedding_provider;
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::llm::{LlmExtractionProvider, LlmJudgmentProvider, ModelRole, ProviderRegistry};
use crate::infrastructure::prompt_template_engine::PromptTemplateEngine;

/// Default page size for `list_examples` without an explicit limit
pub const DEFAULT_EXAMPLE_LIMIT: usize = 100;

/// A judge together with the size of its memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeSummary {
    #[serde(flatten)]
    pub judge: Judge,
    pub principle_count: usize,
    pub example_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJudgeRequest {
    pub name: String,
    pub criterion: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default = "default_min_score")]
    pub min_score: i64,
    #[serde(default = "default_max_score")]
    pub max_score: i64,
}

fn default_min_score() -> i64 {
    1
}

fn default_max_score() -> i64 {
    5
}

#[async_trait]
pub trait MemAlignService: Send + Sync {
    async fn create_judge(&self, request: CreateJudgeRequest) -> MemAlignResult<Judge>;
    async fn get_judge(&self, name: &str) -> MemAlignResult<Judge>;
    async fn delete_judge(&self, name: &str) -> MemAlignResult<()>;
    async fn list_judges(&self) -> MemAlignResult<Vec<JudgeSummary>>;

    async fn align(&self, judge_name: &str, feedback: FeedbackInput) -> MemAlignResult<AlignmentResult>;
    /// JSONL rows of `FeedbackInput`
    async fn align_batch(&self, judge_name: &str, jsonl: &str) -> MemAlignResult<BatchReport<AlignmentResult>>;

    async fn judge(&self, judge_name: &str, input_text: &str, context: Option<&str>) -> MemAlignResult<JudgmentResult>;
    /// Judge an input and report how to follow up with expert feedback
    async fn align_interactive(
        &self,
        judge_name: &str,
        input_text: &str,
        context: Option<&str>,
    ) -> MemAlignResult<InteractiveEvaluation>;

    /// JSONL rows of `JudgmentInput`
    async fn judge_batch(&self, judge_name: &str, jsonl: &str) -> MemAlignResult<BatchReport<JudgmentResult>>;

    async fn list_principles(&self, judge_name: &str) -> MemAlignResult<Vec<Principle>>;
    async fn update_principle(
        &self,
        judge_name: &str,
        principle_id: PrincipleId,
        text: &str,
    ) -> MemAlignResult<UpdateOutcome>;
    async fn delete_principle(&self, judge_name: &str, principle_id: PrincipleId) -> MemAlignResult<()>;

    async fn list_examples(
        &self,
        judge_name: &str,
        query: Option<&str>,
        limit: Option<usize>,
    ) -> MemAlignResult<Vec<Example>>;
    async fn delete_example(&self, judge_name: &str, example_id: ExampleId) -> MemAlignResult<()>;

    async fn memory_stats(&self, judge_name: &str) -> MemAlignResult<MemoryStats>;
}

pub struct StandardMemAlignService {
    judges: Arc<dyn JudgeRepository>,
    memory: Arc<dyn MemoryRepository>,
    registry: Arc<MemoryRegistry>,
    semantic: Arc<SemanticMemory>,
    episodic: Arc<EpisodicMemory>,
    alignment: AlignmentEngine,
    judgment: JudgmentEngine,
    events: EventBus,
    judge_lifecycle: Mutex<()>,
}

impl StandardMemAlignService {
    pub fn new(
        config: &MemAlignConfig,
        repositories: Repositories,
        embedder: Arc<dyn EmbeddingProvider>,
        extractor: Arc<dyn ExtractionProvider>,
        scorer: Arc<dyn JudgmentProvider>,
    ) -> Self {
        let Repositories { judges, memory } = repositories;
        let events = EventBus::with_default_capacity();
        let registry = Arc::new(MemoryRegistry::new(memory.clone(), embedder.dimension()));

        let semantic = Arc::new(SemanticMemory::new(
            registry.clone(),
            memory.clone(),
            embedder.clone(),
            events.clone(),
            config.similarity_threshold,
            config.consistency,
        ));
        let episodic = Arc::new(EpisodicMemory::new(
            registry.clone(),
            memory.clone(),
            embedder,
            events.clone(),
        ));
        let builder = Arc::new(WorkingMemoryBuilder::new(semantic.clone(), episodic.clone()));

        Self {
            judges,
            memory,
            registry,
            alignment: AlignmentEngine::new(semantic.clone(), episodic.clone(), extractor),
            judgment: JudgmentEngine::new(
                builder,
                scorer,
                events.clone(),
                config.retrieval_k,
                config.require_memory,
            ),
            semantic,
            episodic,
            events,
            judge_lifecycle: Mutex::new(()),
        }
    }

    /// Wire repositories, embedder and LLM-backed providers from configuration
    pub fn from_config(config: &MemAlignConfig) -> anyhow::Result<Self> {
        config.validate()?;

        let repositories = create_repositories(config.storage, &config.data_dir)
            .map_err(|e| anyhow::anyhow!("Failed to open storage at {}: {}", config.data_dir.display(), e))?;
        let embedder = build_embedding_provider(&config.embedding)?;

        let llms = ProviderRegistry::from_config(config)?;
        let prompts = Arc::new(PromptTemplateEngine::new()?);
        let extractor = Arc::new(LlmExtractionProvider::new(
            llms.get(ModelRole::Extraction)?,
            prompts.clone(),
            &config.extraction,
        ));
        let scorer = Arc::new(LlmJudgmentProvider::new(
            llms.get(ModelRole::Judgment)?,
            prompts,
            &config.judgment,
        ));

        info!(
            "MemAlign service ready ({:?} storage at {}, threshold {}, k={})",
            config.storage,
            config.data_dir.display(),
            config.similarity_threshold,
            config.retrieval_k
        );
        Ok(Self::new(config, repositories, embedder, extractor, scorer))
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    async fn resolve(&self, name: &str) -> MemAlignResult<Judge> {
        let name = JudgeName::parse(name)?;
        self.judges
            .find_by_name(&name)
            .await?
            .ok_or_else(|| MemAlignError::not_found(EntityKind::Judge, &name))
    }
}

#[async_trait]
impl MemAlignService for StandardMemAlignService {
    async fn create_judge(&self, request: CreateJudgeRequest) -> MemAlignResult<Judge> {
        let judge = Judge::new(
            &request.name,
            request.criterion,
            request.instructions,
            request.min_score,
            request.max_score,
        )?;

        let _lifecycle = self.judge_lifecycle.lock().await;
        if self.judges.find_by_name(&judge.name).await?.is_some() {
            return Err(MemAlignError::DuplicateJudge(judge.name.to_string()));
        }
        self.judges.save(&judge).await?;
        self.registry.register_empty(&judge);

        info!("Created judge '{}' (range {})", judge.name, judge.score_range);
        self.events.publish(MemoryEvent::JudgeCreated {
            judge_name: judge.name.clone(),
            timestamp: Utc::now(),
        });
        Ok(judge)
    }

    async fn get_judge(&self, name: &str) -> MemAlignResult<Judge> {
        self.resolve(name).await
    }

    async fn delete_judge(&self, name: &str) -> MemAlignResult<()> {
        let _lifecycle = self.judge_lifecycle.lock().await;
        let judge = self.resolve(name).await?;

        // In-flight operations on this judge fail from here on
        self.registry.retire(&judge).await;
        let teardown = async {
            self.memory.purge_judge(&judge.name).await?;
            self.judges.delete(&judge.name).await?;
            Ok::<_, MemAlignError>(())
        };
        if let Err(e) = teardown.await {
            // The judge record survived; let the next access re-hydrate what is left
            self.registry.forget(&judge.name);
            return Err(e);
        }

        info!("Deleted judge '{}' and its memory", judge.name);
        self.events.publish(MemoryEvent::JudgeDeleted {
            judge_name: judge.name,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn list_judges(&self) -> MemAlignResult<Vec<JudgeSummary>> {
        let mut summaries = Vec::new();
        for judge in self.judges.list_all().await? {
            let principle_count = self.semantic.count(&judge).await?;
            let example_count = self.episodic.count(&judge).await?;
            summaries.push(JudgeSummary {
                judge,
                principle_count,
                example_count,
            });
        }
        Ok(summaries)
    }

    async fn align(&self, judge_name: &str, feedback: FeedbackInput) -> MemAlignResult<AlignmentResult> {
        let judge = self.resolve(judge_name).await?;
        self.alignment.align(&judge, feedback).await
    }

    async fn align_batch(&self, judge_name: &str, jsonl: &str) -> MemAlignResult<BatchReport<AlignmentResult>> {
        let judge = self.resolve(judge_name).await?;
        Ok(self.alignment.align_jsonl(&judge, jsonl).await)
    }

    async fn judge(&self, judge_name: &str, input_text: &str, context: Option<&str>) -> MemAlignResult<JudgmentResult> {
        let judge = self.resolve(judge_name).await?;
        self.judgment.judge(&judge, input_text, context).await
    }

    async fn align_interactive(
        &self,
        judge_name: &str,
        input_text: &str,
        context: Option<&str>,
    ) -> MemAlignResult<InteractiveEvaluation> {
        let judge = self.resolve(judge_name).await?;
        let evaluation = self.judgment.judge(&judge, input_text, context).await?;
        Ok(InteractiveEvaluation::awaiting_feedback(evaluation))
    }

    async fn judge_batch(&self, judge_name: &str, jsonl: &str) -> MemAlignResult<BatchReport<JudgmentResult>> {
        let judge = self.resolve(judge_name).await?;
        Ok(self.judgment.judge_jsonl(&judge, jsonl).await)
    }

    async fn list_principles(&self, judge_name: &str) -> MemAlignResult<Vec<Principle>> {
        let judge = self.resolve(judge_name).await?;
        self.semantic.list_all(&judge).await
    }

    async fn update_principle(
        &self,
        judge_name: &str,
        principle_id: PrincipleId,
        text: &str,
    ) -> MemAlignResult<UpdateOutcome> {
        let judge = self.resolve(judge_name).await?;
        self.semantic.update_text(&judge, principle_id, text).await
    }

    async fn delete_principle(&self, judge_name: &str, principle_id: PrincipleId) -> MemAlignResult<()> {
        let judge = self.resolve(judge_name).await?;
        self.semantic.delete(&judge, principle_id).await
    }

    async fn list_examples(
        &self,
        judge_name: &str,
        query: Option<&str>,
        limit: Option<usize>,
    ) -> MemAlignResult<Vec<Example>> {
        let judge = self.resolve(judge_name).await?;
        self.episodic
            .list_or_search(&judge, query, limit.unwrap_or(DEFAULT_EXAMPLE_LIMIT))
            .await
    }

    async fn delete_example(&self, judge_name: &str, example_id: ExampleId) -> MemAlignResult<()> {
        let judge = self.resolve(judge_name).await?;
        self.episodic.delete(&judge, example_id).await
    }

    async fn memory_stats(&self, judge_name: &str) -> MemAlignResult<MemoryStats> {
        let judge = self.resolve(judge_name).await?;
        let principles = self.semantic.list_all(&judge).await?;
        let examples = self.episodic.all(&judge).await?;
        Ok(MemoryStats::from_records(judge.name, &principles, &examples))
    }
}
