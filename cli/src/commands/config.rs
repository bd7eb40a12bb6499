// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use memalign_core::domain::config::{MemAlignConfig, ModelConfig, CONFIG_PATH_ENV};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file populated with defaults
    Generate {
        /// Output path
        #[arg(short, long, default_value = "./memalign.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, force } => generate(output, force).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = MemAlignConfig::load_or_default(config_override.clone()).context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. {}: {}",
            CONFIG_PATH_ENV,
            std::env::var(CONFIG_PATH_ENV)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./memalign.yaml");
        println!("  4. ~/.memalign/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Memory:".bold());
    println!("  Data dir:             {}", config.data_dir.display());
    println!("  Storage:              {:?}", config.storage);
    println!("  Retrieval k:          {}", config.retrieval_k);
    println!("  Similarity threshold: {}", config.similarity_threshold);
    println!("  Consistency:          {:?}", config.consistency);
    println!("  Require memory:       {}", config.require_memory);
    println!();

    println!("{}", "Embedding:".bold());
    println!("  Provider:  {:?}", config.embedding.provider);
    println!("  Model:     {}", config.embedding.model);
    println!("  Dimension: {}", config.embedding.dimension);
    if let Some(endpoint) = &config.embedding.endpoint {
        println!("  Endpoint:  {}", endpoint);
    }
    println!();

    print_model("Extraction model:", &config.extraction);
    print_model("Judgment model:", &config.judgment);

    println!("{}", "API:".bold());
    println!("  Listen: {}:{}", config.api.bind_address, config.api.port);

    Ok(())
}

fn print_model(title: &str, model: &ModelConfig) {
    println!("{}", title.bold());
    println!("  {} ({:?})", model.model.bold(), model.provider);
    if let Some(endpoint) = &model.endpoint {
        println!("    Endpoint: {}", endpoint);
    }
    let key = match &model.api_key {
        Some(key) if key.starts_with("env:") => key.clone(),
        Some(_) => "(set)".to_string(),
        None => "(not set)".to_string(),
    };
    println!("    API key:  {}", key);
    println!("    Max tokens: {}, temperature: {}", model.max_tokens, model.temperature);
    println!();
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = MemAlignConfig::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }

    MemAlignConfig::default()
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generated_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memalign.yaml");
        generate(path.clone(), false).await.unwrap();

        let loaded = MemAlignConfig::from_yaml_file(&path).unwrap();
        assert!(loaded.validate().is_ok());
        assert_eq!(loaded.retrieval_k, MemAlignConfig::default().retrieval_k);

        assert!(generate(path.clone(), false).await.is_err());
        assert!(generate(path, true).await.is_ok());
    }
}
