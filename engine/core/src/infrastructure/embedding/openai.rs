// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// OpenAI embedding adapter (POST /embeddings); works with compatible servers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::providers::{EmbeddingProvider, ProviderError};
use crate::infrastructure::llm::openai::DEFAULT_OPENAI_ENDPOINT;

pub struct OpenAIEmbedder {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAIEmbedder {
    pub fn new(endpoint: Option<String>, api_key: String, model: String, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_OPENAI_ENDPOINT.to_string()),
            api_key,
            model,
            dimension,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let url = format!("{}/embeddings", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(|e| ProviderError::Embedding(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Embedding(format!("HTTP {}: {}", status, error_text)));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        let embedding = body
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProviderError::MalformedResponse("no embedding returned".into()))?;

        if embedding.len() != self.dimension {
            return Err(ProviderError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.len(),
            });
        }
        Ok(embedding)
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embed_reads_first_vector() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/embeddings")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_body(r#"{"data": [{"embedding": [1.0, 0.0]}]}"#)
            .create_async()
            .await;

        let embedder = OpenAIEmbedder::new(Some(server.url()), "sk-test".into(), "text-embedding-3-small".into(), 2);
        assert_eq!(embedder.embed("hi").await.unwrap(), vec![1.0, 0.0]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_is_embedding_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/embeddings").with_status(500).create_async().await;

        let embedder = OpenAIEmbedder::new(Some(server.url()), "k".into(), "m".into(), 2);
        assert!(matches!(embedder.embed("hi").await, Err(ProviderError::Embedding(_))));
    }
}
