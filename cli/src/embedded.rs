// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Embedded mode: the engine runs in-process, built from the discovered
//! configuration.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;

use memalign_core::application::StandardMemAlignService;
use memalign_core::domain::config::MemAlignConfig;

/// Discover, override and validate configuration
pub fn load_config(config_path: Option<PathBuf>) -> Result<MemAlignConfig> {
    let config = MemAlignConfig::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

/// Build the service for one CLI invocation
pub fn build_service(config: &MemAlignConfig) -> Result<Arc<StandardMemAlignService>> {
    let service = StandardMemAlignService::from_config(config).context("Failed to initialize MemAlign")?;
    Ok(Arc::new(service))
}

/// `load_config` followed by `build_service`
pub fn open(config_path: Option<PathBuf>) -> Result<Arc<StandardMemAlignService>> {
    let config = load_config(config_path)?;
    build_service(&config)
}
