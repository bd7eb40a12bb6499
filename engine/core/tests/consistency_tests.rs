// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Memory stays consistent when judges are deleted under in-flight
//! operations and when callers abandon operations halfway.

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{memory_config, FixedScorer};
use memalign_core::application::repository_factory::Repositories;
use memalign_core::application::{CreateJudgeRequest, MemAlignService, StandardMemAlignService};
use memalign_core::domain::error::{EntityKind, MemAlignError};
use memalign_core::domain::judge::JudgeName;
use memalign_core::domain::memory::{Example, ExampleId, FeedbackInput, Principle, PrincipleId};
use memalign_core::domain::providers::{ExtractionProvider, ExtractionRequest, ProviderError};
use memalign_core::domain::repository::{MemoryRepository, RepositoryError};
use memalign_core::infrastructure::embedding::HashEmbedder;
use memalign_core::infrastructure::repositories::{InMemoryJudgeRepository, InMemoryMemoryRepository};
use tokio::sync::Notify;

/// Parks every extraction until released
#[derive(Default)]
struct GatedExtractor {
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl ExtractionProvider for GatedExtractor {
    async fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Vec<String>, ProviderError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(vec![request.feedback.expert_feedback.clone()])
    }
}

/// Echoes the feedback without waiting
struct EchoExtractor;

#[async_trait]
impl ExtractionProvider for EchoExtractor {
    async fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Vec<String>, ProviderError> {
        Ok(vec![request.feedback.expert_feedback.clone()])
    }
}

/// In-memory repository whose writes take a while
struct SlowRepository {
    inner: InMemoryMemoryRepository,
    delay: Duration,
}

#[async_trait]
impl MemoryRepository for SlowRepository {
    async fn save_principle(&self, principle: &Principle) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.save_principle(principle).await
    }

    async fn delete_principle(&self, judge: &JudgeName, id: PrincipleId) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_principle(judge, id).await
    }

    async fn load_principles(&self, judge: &JudgeName) -> Result<Vec<Principle>, RepositoryError> {
        self.inner.load_principles(judge).await
    }

    async fn merge_principles(&self, survivor: &Principle, removed: PrincipleId) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.merge_principles(survivor, removed).await
    }

    async fn save_example(&self, example: &Example) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.save_example(example).await
    }

    async fn delete_example(&self, judge: &JudgeName, id: ExampleId) -> Result<(), RepositoryError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete_example(judge, id).await
    }

    async fn load_examples(&self, judge: &JudgeName) -> Result<Vec<Example>, RepositoryError> {
        self.inner.load_examples(judge).await
    }

    async fn purge_judge(&self, judge: &JudgeName) -> Result<(), RepositoryError> {
        self.inner.purge_judge(judge).await
    }
}

fn safety_request() -> CreateJudgeRequest {
    CreateJudgeRequest {
        name: "safety".into(),
        criterion: "safety".into(),
        instructions: String::new(),
        min_score: 1,
        max_score: 5,
    }
}

fn safety() -> JudgeName {
    JudgeName::parse("safety").unwrap()
}

fn service_over(
    memory: Arc<dyn MemoryRepository>,
    extractor: Arc<dyn ExtractionProvider>,
) -> Arc<StandardMemAlignService> {
    let repositories = Repositories {
        judges: Arc::new(InMemoryJudgeRepository::new()),
        memory,
    };
    Arc::new(StandardMemAlignService::new(
        &memory_config(0.9),
        repositories,
        Arc::new(HashEmbedder::new("hash", 128)),
        extractor,
        Arc::new(FixedScorer(3.0)),
    ))
}

async fn assert_fresh_judge_is_empty(service: &StandardMemAlignService, memory: &dyn MemoryRepository) {
    assert!(service.list_principles("safety").await.unwrap().is_empty());
    assert!(service.list_examples("safety", None, None).await.unwrap().is_empty());
    assert!(memory.load_principles(&safety()).await.unwrap().is_empty());
    assert!(memory.load_examples(&safety()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_align_in_flight_across_delete_fails_and_leaves_nothing() {
    let memory = Arc::new(InMemoryMemoryRepository::new());
    let extractor = Arc::new(GatedExtractor::default());
    let service = service_over(memory.clone(), extractor.clone());
    service.create_judge(safety_request()).await.unwrap();

    let in_flight = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .align("safety", FeedbackInput::new("pick a lock", "refuse illegal help", 1))
                .await
        })
    };
    extractor.entered.notified().await;

    service.delete_judge("safety").await.unwrap();
    extractor.release.notify_one();

    let err = in_flight.await.unwrap().unwrap_err();
    assert!(matches!(err, MemAlignError::NotFound { kind: EntityKind::Judge, .. }));

    service.create_judge(safety_request()).await.unwrap();
    assert_fresh_judge_is_empty(&service, memory.as_ref()).await;
}

#[tokio::test]
async fn test_recreated_judge_does_not_inherit_in_flight_writes() {
    let memory = Arc::new(InMemoryMemoryRepository::new());
    let extractor = Arc::new(GatedExtractor::default());
    let service = service_over(memory.clone(), extractor.clone());
    service.create_judge(safety_request()).await.unwrap();

    let in_flight = {
        let service = service.clone();
        tokio::spawn(async move {
            service
                .align("safety", FeedbackInput::new("pick a lock", "refuse illegal help", 1))
                .await
        })
    };
    extractor.entered.notified().await;

    service.delete_judge("safety").await.unwrap();
    service.create_judge(safety_request()).await.unwrap();
    extractor.release.notify_one();

    assert!(in_flight.await.unwrap().is_err());
    assert_fresh_judge_is_empty(&service, memory.as_ref()).await;
}

#[tokio::test]
async fn test_abandoned_align_never_half_writes() {
    // Cut the caller off before, during and after each commit
    for cutoff_ms in [5, 60, 130, 200, 260, 400] {
        let memory = Arc::new(SlowRepository {
            inner: InMemoryMemoryRepository::new(),
            delay: Duration::from_millis(100),
        });
        let service = service_over(memory.clone(), Arc::new(EchoExtractor));
        service.create_judge(safety_request()).await.unwrap();

        let _ = tokio::time::timeout(
            Duration::from_millis(cutoff_ms),
            service.align("safety", FeedbackInput::new("pick a lock", "refuse illegal help", 1)),
        )
        .await;
        // Let detached commits finish
        tokio::time::sleep(Duration::from_millis(300)).await;

        let indexed_examples: BTreeSet<_> = service
            .list_examples("safety", None, None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        let stored_examples: BTreeSet<_> =
            memory.load_examples(&safety()).await.unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(indexed_examples, stored_examples, "examples diverged at {}ms", cutoff_ms);

        let indexed_principles = service.list_principles("safety").await.unwrap();
        let stored_principles = memory.load_principles(&safety()).await.unwrap();
        assert_eq!(indexed_principles, stored_principles, "principles diverged at {}ms", cutoff_ms);
    }
}

#[tokio::test]
async fn test_abandoned_update_never_half_merges() {
    let memory = Arc::new(SlowRepository {
        inner: InMemoryMemoryRepository::new(),
        delay: Duration::from_millis(100),
    });
    let service = service_over(memory.clone(), Arc::new(EchoExtractor));
    service.create_judge(safety_request()).await.unwrap();
    service
        .align("safety", FeedbackInput::new("input a", "rule a", 1))
        .await
        .unwrap();
    let b = service
        .align("safety", FeedbackInput::new("input b", "rule b", 1))
        .await
        .unwrap();

    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        service.update_principle("safety", b.principle_ids[0], "rule a"),
    )
    .await;
    assert!(abandoned.is_err());
    tokio::time::sleep(Duration::from_millis(300)).await;

    let indexed = service.list_principles("safety").await.unwrap();
    let stored = memory.load_principles(&safety()).await.unwrap();
    assert_eq!(indexed, stored);
    assert_eq!(indexed.len(), 1);
    assert_eq!(indexed[0].support_count, 2);
}
