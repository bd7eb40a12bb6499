// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Principle extraction backed by an LLM

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::domain::config::ModelConfig;
use crate::domain::llm::{GenerationOptions, LLMProvider};
use crate::domain::providers::{ExtractionProvider, ExtractionRequest, ProviderError};
use crate::infrastructure::prompt_template_engine::PromptTemplateEngine;

use super::response::parse_json_object;

pub struct LlmExtractionProvider {
    llm: Arc<dyn LLMProvider>,
    prompts: Arc<PromptTemplateEngine>,
    options: GenerationOptions,
}

impl LlmExtractionProvider {
    pub fn new(llm: Arc<dyn LLMProvider>, prompts: Arc<PromptTemplateEngine>, model: &ModelConfig) -> Self {
        Self {
            llm,
            prompts,
            options: GenerationOptions {
                max_tokens: Some(model.max_tokens),
                temperature: Some(model.temperature),
                ..GenerationOptions::default()
            },
        }
    }
}

/// Reads `{"principles": [{"text": ...} | "...", ...]}`; blank entries are dropped
fn parse_principles(text: &str) -> Result<Vec<String>, ProviderError> {
    let object = parse_json_object(text)?;

    let entries = match object.get("principles") {
        Some(Value::Array(entries)) => entries,
        Some(Value::Null) | None => return Ok(Vec::new()),
        Some(_) => {
            return Err(ProviderError::MalformedResponse(
                "'principles' must be a list".to_string(),
            ))
        }
    };

    let candidates = entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(s) => Some(s.as_str()),
            Value::Object(o) => o.get("text").and_then(Value::as_str),
            _ => None,
        })
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    Ok(candidates)
}

#[async_trait]
impl ExtractionProvider for LlmExtractionProvider {
    async fn extract(&self, request: &ExtractionRequest<'_>) -> Result<Vec<String>, ProviderError> {
        let prompt = self.prompts.render_extraction(request)?;
        let options = self.options.clone().with_system(prompt.system);

        let response = self.llm.generate(&prompt.user, &options).await?;
        debug!(
            provider = %response.provider,
            model = %response.model,
            tokens = response.usage.total_tokens,
            "Extraction response received"
        );

        parse_principles(&response.text)
    }
}
