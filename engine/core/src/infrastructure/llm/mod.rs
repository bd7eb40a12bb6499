// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// LLM Provider Infrastructure - Anti-Corruption Layer Implementations
//
// Each provider adapter translates between the domain LLMProvider interface
// and an external API. Extraction and judgment adapters sit on top of them.

pub mod anthropic;
pub mod extraction;
pub mod ollama;
pub mod openai;
pub mod registry;
pub mod response;
pub mod scoring;

pub use extraction::LlmExtractionProvider;
pub use registry::{ModelRole, ProviderRegistry};
pub use scoring::LlmJudgmentProvider;
