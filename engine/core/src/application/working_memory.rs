// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Working memory assembly: every principle of the judge, unranked, plus the
//! top-k examples most similar to the input.

use std::sync::Arc;

use tracing::debug;

use crate::application::episodic_memory::EpisodicMemory;
use crate::application::semantic_memory::SemanticMemory;
use crate::domain::error::{MemAlignError, MemAlignResult};
use crate::domain::judge::Judge;
use crate::domain::memory::WorkingMemory;

pub struct WorkingMemoryBuilder {
    semantic: Arc<SemanticMemory>,
    episodic: Arc<EpisodicMemory>,
}

impl WorkingMemoryBuilder {
    pub fn new(semantic: Arc<SemanticMemory>, episodic: Arc<EpisodicMemory>) -> Self {
        Self { semantic, episodic }
    }

    /// With `require_memory` unset an empty judge yields an empty context
    /// and judgment proceeds zero-shot.
    pub async fn build(
        &self,
        judge: &Judge,
        input_text: &str,
        k: usize,
        require_memory: bool,
    ) -> MemAlignResult<WorkingMemory> {
        let principles = self.semantic.list_all(judge).await?;
        let examples = self.episodic.retrieve(judge, input_text, k).await?;

        let memory = WorkingMemory { principles, examples };
        if require_memory && memory.is_empty() {
            return Err(MemAlignError::EmptyMemory(judge.name.to_string()));
        }

        debug!(
            "Working memory for judge '{}': {} principles, {} examples (k={})",
            judge.name,
            memory.principles.len(),
            memory.examples.len(),
            k
        );
        Ok(memory)
    }
}
