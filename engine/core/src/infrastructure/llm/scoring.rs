// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Scoring backed by an LLM
//
// Returns the raw numeric score; range and integrality checks belong to the
// judgment engine.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::domain::config::ModelConfig;
use crate::domain::llm::{GenerationOptions, LLMProvider};
use crate::domain::providers::{JudgmentProvider, ProviderError, ProviderScore, ScoringRequest};
use crate::infrastructure::prompt_template_engine::PromptTemplateEngine;

use super::response::parse_json_object;

pub struct LlmJudgmentProvider {
    llm: Arc<dyn LLMProvider>,
    prompts: Arc<PromptTemplateEngine>,
    options: GenerationOptions,
}

impl LlmJudgmentProvider {
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

fn parse_score(text: &str) -> Result<ProviderScore, ProviderError> {
    let object = parse_json_object(text)?;

    let score = match object.get("score") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|s| s.is_finite())
    .ok_or_else(|| ProviderError::MalformedResponse("response has no numeric 'score'".to_string()))?;

    let reasoning = object
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(ProviderScore { score, reasoning })
}

#[async_trait]
impl JudgmentProvider for LlmJudgmentProvider {
    async fn score(&self, request: &ScoringRequest<'_>) -> Result<ProviderScore, ProviderError> {
        let prompt = self.prompts.render_judgment(request)?;
        let options = self.options.clone().with_system(prompt.system);

        let response = self.llm.generate(&prompt.user, &options).await?;
        debug!(
            provider = %response.provider,
            model = %response.model,
            tokens = response.usage.total_tokens,
            "Judgment response received"
        );

        parse_score(&response.text)
    }
}
