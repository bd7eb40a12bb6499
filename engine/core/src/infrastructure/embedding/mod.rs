// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Embedding provider adapters

pub mod hash;
pub mod ollama;
pub mod openai;

use std::sync::Arc;

use crate::domain::config::{EmbeddingConfig, EmbeddingProviderKind};
use crate::domain::providers::EmbeddingProvider;
use crate::infrastructure::llm::registry::resolve_api_key;

pub use hash::HashEmbedder;
pub use ollama::OllamaEmbedder;
pub use openai::OpenAIEmbedder;

/// Build the configured embedding provider
pub fn build_embedding_provider(config: &EmbeddingConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    tracing::info!(
        "Initializing embedding provider {:?} (model: {}, dimension: {})",
        config.provider,
        config.model,
        config.dimension
    );

    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingProviderKind::Hash => Arc::new(HashEmbedder::new(config.model.clone(), config.dimension)),
        EmbeddingProviderKind::Ollama => Arc::new(OllamaEmbedder::new(
            config.endpoint.clone(),
            config.model.clone(),
            config.dimension,
        )),
        EmbeddingProviderKind::OpenAI => Arc::new(OpenAIEmbedder::new(
            config.endpoint.clone(),
            resolve_api_key(&config.api_key)?,
            config.model.clone(),
            config.dimension,
        )),
    };

    Ok(provider)
}
