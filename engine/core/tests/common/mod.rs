// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Deterministic collaborators shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use memalign_core::application::repository_factory::{create_repositories, Repositories};
use memalign_core::application::StandardMemAlignService;
use memalign_core::domain::config::{ConsistencyMode, MemAlignConfig};
use memalign_core::domain::providers::{
    EmbeddingProvider, ExtractionProvider, ExtractionRequest, JudgmentProvider, ProviderError, ProviderScore,
    ScoringRequest,
};
use memalign_core::domain::repository::StorageBackend;
use memalign_core::infrastructure::embedding::HashEmbedder;

/// Fixed vectors for known texts, hashed embeddings for everything else
pub struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
    fallback: HashEmbedder,
}

impl TableEmbedder {
    pub fn new(dimension: usize, entries: &[(&str, Vec<f32>)]) -> Self {
        Self {
            table: entries
                .iter()
                .map(|(text, vector)| (text.to_string(), vector.clone()))
                .collect(),
            fallback: HashEmbedder::new("table", dimension),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        match self.table.get(text) {
            Some(vector) => Ok(vector.clone()),
            None => self.fallback.embed(text).await,
        }
    }

    fn model_id(&self) -> &str {
        "table"
    }

    fn dimension(&self) -> usize {
        self.fallback.dimension()
    }
}

/// Maps expert feedback to scripted candidates; unknown feedback yields itself
#[derive(Default)]
pub struct ScriptedExtractor {
    script: HashMap<String, Vec<String>>,
}

impl ScriptedExtractor {
    pub fn with(mut self, feedback: &str, candidates: &[&str]) -> Self {
        self.script.insert(
            feedback.to_string(),
            candidates.iter().map(|c| c.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl ExtractionProvider for ScriptedExtractor {
    async fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Vec<String>, ProviderError> {
        let feedback = &request.feedback.expert_feedback;
        Ok(self
            .script
            .get(feedback)
            .cloned()
            .unwrap_or_else(|| vec![feedback.clone()]))
    }
}

/// Always returns the same score
pub struct FixedScorer(pub f64);

#[async_trait]
impl JudgmentProvider for FixedScorer {
    async fn score(&self, request: &ScoringRequest<'_>) -> Result<ProviderScore, ProviderError> {
        Ok(ProviderScore {
            score: self.0,
            reasoning: format!(
                "{} principles, {} examples",
                request.principles.len(),
                request.examples.len()
            ),
        })
    }
}

pub fn memory_config(threshold: f64) -> MemAlignConfig {
    MemAlignConfig {
        storage: StorageBackend::Memory,
        similarity_threshold: threshold,
        ..MemAlignConfig::default()
    }
}

pub fn service_with(
    config: &MemAlignConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    extractor: ScriptedExtractor,
    score: f64,
) -> StandardMemAlignService {
    let repositories: Repositories =
        create_repositories(config.storage, &config.data_dir).expect("repositories");
    StandardMemAlignService::new(config, repositories, embedder, Arc::new(extractor), Arc::new(FixedScorer(score)))
}

pub fn hashed_service(extractor: ScriptedExtractor) -> StandardMemAlignService {
    service_with(&memory_config(0.9), Arc::new(HashEmbedder::new("hash", 256)), extractor, 3.0)
}

pub fn serialized(mut config: MemAlignConfig) -> MemAlignConfig {
    config.consistency = ConsistencyMode::Serialized;
    config
}
