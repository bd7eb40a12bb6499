// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod alignment;
pub mod batch;
pub mod episodic_memory;
pub mod judgment;
pub mod memory_registry;
pub mod repository_factory;
pub mod semantic_memory;
pub mod service;
pub mod working_memory;

// Re-export use cases for convenience
pub use alignment::AlignmentEngine;
pub use episodic_memory::EpisodicMemory;
pub use judgment::JudgmentEngine;
pub use memory_registry::MemoryRegistry;
pub use semantic_memory::SemanticMemory;
pub use service::{CreateJudgeRequest, JudgeSummary, MemAlignService, StandardMemAlignService};
pub use working_memory::WorkingMemoryBuilder;
