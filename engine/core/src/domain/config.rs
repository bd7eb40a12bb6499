// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Engine Configuration
//
// Defines the configuration schema for the memory engine:
// - Storage backend and data directory
// - Retrieval and deduplication tuning (k, similarity threshold)
// - Merge consistency mode
// - Embedding, extraction and judgment provider settings
// - HTTP API binding
//
// Every field has a default, so an empty YAML document is a valid config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::domain::repository::StorageBackend;

pub const CONFIG_PATH_ENV: &str = "MEMALIGN_CONFIG_PATH";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemAlignConfig {
    /// Root directory for persisted judges and memory
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub storage: StorageBackend,

    /// Number of episodic examples retrieved per judgment
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,

    /// Cosine similarity at or above which two principles are duplicates
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    #[serde(default)]
    pub consistency: ConsistencyMode,

    /// Refuse to judge when a judge has neither principles nor examples
    #[serde(default)]
    pub require_memory: bool,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default = "default_extraction_model")]
    pub extraction: ModelConfig,

    #[serde(default = "default_judgment_model")]
    pub judgment: ModelConfig,

    #[serde(default)]
    pub api: ApiConfig,
}

/// How `SemanticMemory::merge` guards search-nearest -> conditional-insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyMode {
    /// Concurrent merges on one judge may both insert near-duplicates
    #[default]
    Optimistic,
    /// A per-judge lock is held across search and commit
    Serialized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Deterministic offline feature-hashing embedder
    #[default]
    Hash,
    Ollama,
    #[serde(rename = "openai")]
    OpenAI,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// API key; supports "env:VAR_NAME"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub provider: LlmProviderKind,

    pub model: String,

    /// Base URL; provider default when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// API key; supports "env:VAR_NAME"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    /// Retries on network and rate-limit failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retries; doubles per attempt
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".memalign")
}

fn default_retrieval_k() -> usize {
    5
}

fn default_similarity_threshold() -> f64 {
    0.90
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_embedding_dimension() -> usize {
    384
}

fn default_max_tokens() -> u32 {
    2048
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_extraction_model() -> ModelConfig {
    ModelConfig::anthropic("claude-haiku-4-5-20251001")
}

fn default_judgment_model() -> ModelConfig {
    ModelConfig::anthropic("claude-sonnet-4-5-20250929")
}

impl ModelConfig {
    pub fn anthropic(model: impl Into<String>) -> Self {
        Self {
            provider: LlmProviderKind::Anthropic,
            model: model.into(),
            endpoint: None,
            api_key: None,
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: default_embedding_model(),
            endpoint: None,
            api_key: None,
            dimension: default_embedding_dimension(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

impl Default for MemAlignConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            storage: StorageBackend::default(),
            retrieval_k: default_retrieval_k(),
            similarity_threshold: default_similarity_threshold(),
            consistency: ConsistencyMode::default(),
            require_memory: false,
            embedding: EmbeddingConfig::default(),
            extraction: default_extraction_model(),
            judgment: default_judgment_model(),
            api: ApiConfig::default(),
        }
    }
}

impl MemAlignConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parse configuration from YAML string; an empty document yields defaults
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. MEMALIGN_CONFIG_PATH environment variable
    /// 2. ./memalign.yaml (working directory)
    /// 3. ~/.memalign/config.yaml (user home)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./memalign.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".memalign").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path must exist and parse
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup (the process environment in production)
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("MEMALIGN_PROJECT_DIR") {
            tracing::info!("Environment override: MEMALIGN_PROJECT_DIR={}", dir);
            self.data_dir = PathBuf::from(dir).join(".memalign");
        }

        if let Some(val) = lookup("MEMALIGN_RETRIEVAL_K") {
            match val.parse::<usize>() {
                Ok(k) if k > 0 => self.retrieval_k = k,
                _ => tracing::warn!(
                    "Invalid value for MEMALIGN_RETRIEVAL_K: '{}'. Expected a positive integer. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("MEMALIGN_SIMILARITY_THRESHOLD") {
            match val.parse::<f64>() {
                Ok(t) if (-1.0..=1.0).contains(&t) => self.similarity_threshold = t,
                _ => tracing::warn!(
                    "Invalid value for MEMALIGN_SIMILARITY_THRESHOLD: '{}'. Expected a number in [-1, 1]. Ignoring.",
                    val
                ),
            }
        }

        if let Some(model) = lookup("MEMALIGN_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(model) = lookup("MEMALIGN_EXTRACTION_MODEL") {
            self.extraction.model = model;
        }
        if let Some(model) = lookup("MEMALIGN_JUDGMENT_MODEL") {
            self.judgment.model = model;
        }

        // Anthropic key is picked up from the environment unless configured explicitly
        if let Some(key) = lookup("ANTHROPIC_API_KEY") {
            for model in [&mut self.extraction, &mut self.judgment] {
                if model.provider == LlmProviderKind::Anthropic && model.api_key.is_none() {
                    model.api_key = Some(key.clone());
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.retrieval_k == 0 {
            anyhow::bail!("retrieval_k must be at least 1");
        }

        if !(-1.0..=1.0).contains(&self.similarity_threshold) {
            anyhow::bail!(
                "similarity_threshold must lie in [-1, 1], got {}",
                self.similarity_threshold
            );
        }

        if self.embedding.dimension == 0 {
            anyhow::bail!("embedding.dimension must be greater than zero");
        }

        if self.embedding.model.is_empty() {
            anyhow::bail!("embedding.model cannot be empty");
        }

        for (section, model) in [("extraction", &self.extraction), ("judgment", &self.judgment)] {
            if model.model.is_empty() {
                anyhow::bail!("{}.model cannot be empty", section);
            }
            if model.max_tokens == 0 {
                anyhow::bail!("{}.max_tokens must be greater than zero", section);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config = MemAlignConfig::from_yaml_str("").unwrap();
        assert_eq!(config.retrieval_k, 5);
        assert_eq!(config.similarity_threshold, 0.90);
        assert_eq!(config.storage, StorageBackend::Sled);
        assert_eq!(config.consistency, ConsistencyMode::Optimistic);
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.judgment.model, "claude-sonnet-4-5-20250929");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
storage: memory
retrieval_k: 3
similarity_threshold: 0.85
consistency: serialized
embedding:
  provider: ollama
  model: nomic-embed-text
  dimension: 768
judgment:
  provider: openai
  model: gpt-4o
  api_key: env:OPENAI_API_KEY
"#;
        let config = MemAlignConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.retrieval_k, 3);
        assert_eq!(config.consistency, ConsistencyMode::Serialized);
        assert_eq!(config.embedding.provider, EmbeddingProviderKind::Ollama);
        assert_eq!(config.judgment.provider, LlmProviderKind::OpenAI);
        assert_eq!(config.judgment.max_tokens, 2048);
        assert_eq!(config.extraction.provider, LlmProviderKind::Anthropic);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MEMALIGN_PROJECT_DIR", "/tmp/project"),
            ("MEMALIGN_RETRIEVAL_K", "8"),
            ("MEMALIGN_SIMILARITY_THRESHOLD", "0.8"),
            ("MEMALIGN_JUDGMENT_MODEL", "claude-opus"),
            ("ANTHROPIC_API_KEY", "sk-test"),
        ]
        .into_iter()
        .collect();

        let mut config = MemAlignConfig::default();
        config.apply_overrides_from(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.data_dir, PathBuf::from("/tmp/project/.memalign"));
        assert_eq!(config.retrieval_k, 8);
        assert_eq!(config.similarity_threshold, 0.8);
        assert_eq!(config.judgment.model, "claude-opus");
        assert_eq!(config.extraction.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_invalid_overrides_are_ignored() {
        let mut config = MemAlignConfig::default();
        config.apply_overrides_from(|k| match k {
            "MEMALIGN_RETRIEVAL_K" => Some("zero".to_string()),
            "MEMALIGN_SIMILARITY_THRESHOLD" => Some("1.5".to_string()),
            _ => None,
        });
        assert_eq!(config.retrieval_k, 5);
        assert_eq!(config.similarity_threshold, 0.90);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MemAlignConfig::default();
        config.retrieval_k = 0;
        assert!(config.validate().is_err());

        let mut config = MemAlignConfig::default();
        config.similarity_threshold = 1.01;
        assert!(config.validate().is_err());

        let mut config = MemAlignConfig::default();
        config.embedding.dimension = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memalign.yaml");
        let mut config = MemAlignConfig::default();
        config.retrieval_k = 9;
        config.to_yaml_file(&path).unwrap();

        let loaded = MemAlignConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.retrieval_k, 9);
    }
}
