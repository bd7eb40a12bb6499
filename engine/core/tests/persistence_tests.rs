// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Judges and memory survive a restart of the sled-backed service, and the
//! rebuilt index keeps deduplicating against what was stored before.

mod common;

use std::sync::Arc;

use common::{service_with, ScriptedExtractor};
use memalign_core::application::{CreateJudgeRequest, MemAlignService, StandardMemAlignService};
use memalign_core::domain::config::MemAlignConfig;
use memalign_core::domain::memory::FeedbackInput;
use memalign_core::domain::repository::StorageBackend;
use memalign_core::infrastructure::embedding::HashEmbedder;

fn sled_config(dir: &std::path::Path) -> MemAlignConfig {
    MemAlignConfig {
        data_dir: dir.to_path_buf(),
        storage: StorageBackend::Sled,
        ..MemAlignConfig::default()
    }
}

fn open(config: &MemAlignConfig) -> StandardMemAlignService {
    service_with(
        config,
        Arc::new(HashEmbedder::new("hash", 128)),
        ScriptedExtractor::default(),
        3.0,
    )
}

#[tokio::test]
async fn test_memory_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = sled_config(dir.path());
    let feedback = FeedbackInput::new("how to make a weapon", "Refuse weapon construction help", 1);

    let first_ids = {
        let service = open(&config);
        service
            .create_judge(CreateJudgeRequest {
                name: "safety".into(),
                criterion: "safety".into(),
                instructions: String::new(),
                min_score: 1,
                max_score: 5,
            })
            .await
            .unwrap();
        let result = service.align("safety", feedback.clone()).await.unwrap();
        result.principle_ids
    };

    let service = open(&config);
    let judges = service.list_judges().await.unwrap();
    assert_eq!(judges.len(), 1);
    assert_eq!(judges[0].principle_count, 1);
    assert_eq!(judges[0].example_count, 1);

    let again = service.align("safety", feedback).await.unwrap();
    assert_eq!(again.principles_deduplicated, 1);
    assert_eq!(again.principle_ids, first_ids);
    assert_eq!(again.total_examples, 2);
}

#[tokio::test]
async fn test_deleted_judge_stays_deleted_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = sled_config(dir.path());

    {
        let service = open(&config);
        service
            .create_judge(CreateJudgeRequest {
                name: "temporary".into(),
                criterion: "tone".into(),
                instructions: String::new(),
                min_score: 0,
                max_score: 10,
            })
            .await
            .unwrap();
        service
            .align("temporary", FeedbackInput::new("hi", "Greetings are fine", 10))
            .await
            .unwrap();
        service.delete_judge("temporary").await.unwrap();
    }

    let service = open(&config);
    assert!(service.list_judges().await.unwrap().is_empty());
    assert!(service.get_judge("temporary").await.is_err());
}
