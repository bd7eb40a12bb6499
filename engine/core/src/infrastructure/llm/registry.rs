// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Registry - Role Resolution and Provider Management
//
// Builds the extraction and judgment LLM providers from configuration and
// wraps each in a retry policy (exponential backoff on network and rate-limit
// failures). The memory engine itself never retries.

use crate::domain::config::{LlmProviderKind, MemAlignConfig, ModelConfig};
use crate::domain::llm::{GenerationOptions, GenerationResponse, LLMError, LLMProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use super::anthropic::AnthropicAdapter;
use super::ollama::OllamaAdapter;
use super::openai::OpenAIAdapter;

/// Which engine stage a provider serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelRole {
    Extraction,
    Judgment,
}

impl std::fmt::Display for ModelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelRole::Extraction => write!(f, "extraction"),
            ModelRole::Judgment => write!(f, "judgment"),
        }
    }
}

/// Registry of configured LLM providers, keyed by role
pub struct ProviderRegistry {
    providers: HashMap<ModelRole, Arc<dyn LLMProvider>>,
}

impl ProviderRegistry {
    /// Create provider registry from engine configuration
    pub fn from_config(config: &MemAlignConfig) -> anyhow::Result<Self> {
        info!("Initializing LLM provider registry");

        let mut providers = HashMap::new();
        for (role, model_config) in [
            (ModelRole::Extraction, &config.extraction),
            (ModelRole::Judgment, &config.judgment),
        ] {
            info!(
                "Mapping role '{}' -> {} ({:?})",
                role, model_config.model, model_config.provider
            );
            let provider = Self::create_provider(model_config)
                .map_err(|e| anyhow::anyhow!("Failed to initialize {} provider: {}", role, e))?;
            providers.insert(role, provider);
        }

        Ok(Self { providers })
    }

    /// Create a provider instance from configuration, wrapped with retries
    pub fn create_provider(config: &ModelConfig) -> anyhow::Result<Arc<dyn LLMProvider>> {
        let api_key = resolve_api_key(&config.api_key)?;

        let adapter: Arc<dyn LLMProvider> = match config.provider {
            LlmProviderKind::Anthropic => {
                if api_key.is_empty() {
                    anyhow::bail!(
                        "No API key configured for anthropic (set ANTHROPIC_API_KEY or api_key)"
                    );
                }
                Arc::new(AnthropicAdapter::new(
                    config.endpoint.clone(),
                    api_key,
                    config.model.clone(),
                ))
            }
            LlmProviderKind::OpenAI => Arc::new(OpenAIAdapter::new(
                config.endpoint.clone(),
                api_key,
                config.model.clone(),
            )),
            LlmProviderKind::Ollama => {
                Arc::new(OllamaAdapter::new(config.endpoint.clone(), config.model.clone()))
            }
        };

        Ok(Arc::new(RetryingProvider::new(
            adapter,
            config.max_retries,
            config.retry_delay_ms,
        )))
    }

    /// Provider for a role; both roles are always registered by `from_config`
    pub fn get(&self, role: ModelRole) -> Result<Arc<dyn LLMProvider>, LLMError> {
        self.providers
            .get(&role)
            .cloned()
            .ok_or_else(|| LLMError::ModelNotFound(format!("No provider for role '{}'", role)))
    }

    /// Check health of all providers
    pub async fn health_check_all(&self) -> HashMap<ModelRole, Result<(), LLMError>> {
        let mut results = HashMap::new();

        for (role, provider) in &self.providers {
            info!("Health checking {} provider", role);
            results.insert(*role, provider.health_check().await);
        }

        results
    }
}

/// Resolve API key from config (supports "env:VAR_NAME" syntax)
pub fn resolve_api_key(key: &Option<String>) -> anyhow::Result<String> {
    match key {
        Some(k) => match k.strip_prefix("env:") {
            Some(var_name) => std::env::var(var_name)
                .map_err(|_| anyhow::anyhow!("Environment variable not set: {}", var_name)),
            None => Ok(k.clone()),
        },
        None => Ok(String::new()), // For local providers without auth
    }
}

/// Retries transient failures with exponential backoff
pub struct RetryingProvider {
    inner: Arc<dyn LLMProvider>,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LLMProvider>, max_retries: u32, retry_delay_ms: u64) -> Self {
        Self {
            inner,
            max_retries,
            retry_delay_ms,
        }
    }

    fn is_transient(error: &LLMError) -> bool {
        matches!(error, LLMError::Network(_) | LLMError::RateLimit)
    }
}

#[async_trait]
impl LLMProvider for RetryingProvider {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<GenerationResponse, LLMError> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(prompt, options).await {
                Ok(response) => return Ok(response),
                Err(e) if Self::is_transient(&e) && attempt < self.max_retries => {
                    warn!(
                        "Generation failed (attempt {}/{}): {}",
                        attempt + 1,
                        self.max_retries + 1,
                        e
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(
                        self.retry_delay_ms * 2_u64.pow(attempt),
                    ))
                    .await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health_check(&self) -> Result<(), LLMError> {
        self.inner.health_check().await
    }
}
