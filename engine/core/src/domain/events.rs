// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain events for judge memory
//! Published to the EventBus for observability and integration

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::judge::JudgeName;
use crate::domain::memory::{ExampleId, PrincipleId};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryEvent {
    // Judge lifecycle

    JudgeCreated {
        judge_name: JudgeName,
        timestamp: DateTime<Utc>,
    },

    /// Judge and all of its memory were removed
    JudgeDeleted {
        judge_name: JudgeName,
        timestamp: DateTime<Utc>,
    },

    // Episodic memory

    ExampleStored {
        judge_name: JudgeName,
        example_id: ExampleId,
        expert_score: i64,
        timestamp: DateTime<Utc>,
    },

    ExampleDeleted {
        judge_name: JudgeName,
        example_id: ExampleId,
        timestamp: DateTime<Utc>,
    },

    // Semantic memory

    /// A candidate had no near-duplicate and became a new principle
    PrincipleDiscovered {
        judge_name: JudgeName,
        principle_id: PrincipleId,
        source_example_id: Option<ExampleId>,
        timestamp: DateTime<Utc>,
    },

    /// A candidate matched an existing principle (deduplication)
    PrincipleReinforced {
        judge_name: JudgeName,
        principle_id: PrincipleId,
        similarity: f64,
        support_count: u64,
        source_example_id: Option<ExampleId>,
        timestamp: DateTime<Utc>,
    },

    PrincipleUpdated {
        judge_name: JudgeName,
        principle_id: PrincipleId,
        timestamp: DateTime<Utc>,
    },

    /// An update made a principle a duplicate of a sibling; it was folded in
    PrincipleMerged {
        judge_name: JudgeName,
        removed_id: PrincipleId,
        merged_into: PrincipleId,
        similarity: f64,
        timestamp: DateTime<Utc>,
    },

    PrincipleDeleted {
        judge_name: JudgeName,
        principle_id: PrincipleId,
        timestamp: DateTime<Utc>,
    },

    // Judgment

    JudgmentRendered {
        judge_name: JudgeName,
        score: i64,
        principles_used: usize,
        examples_retrieved: usize,
        timestamp: DateTime<Utc>,
    },
}

impl MemoryEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            MemoryEvent::JudgeCreated { .. } => "judge_created",
            MemoryEvent::JudgeDeleted { .. } => "judge_deleted",
            MemoryEvent::ExampleStored { .. } => "example_stored",
            MemoryEvent::ExampleDeleted { .. } => "example_deleted",
            MemoryEvent::PrincipleDiscovered { .. } => "principle_discovered",
            MemoryEvent::PrincipleReinforced { .. } => "principle_reinforced",
            MemoryEvent::PrincipleUpdated { .. } => "principle_updated",
            MemoryEvent::PrincipleMerged { .. } => "principle_merged",
            MemoryEvent::PrincipleDeleted { .. } => "principle_deleted",
            MemoryEvent::JudgmentRendered { .. } => "judgment_rendered",
        }
    }

    pub fn judge_name(&self) -> &JudgeName {
        match self {
            MemoryEvent::JudgeCreated { judge_name, .. }
            | MemoryEvent::JudgeDeleted { judge_name, .. }
            | MemoryEvent::ExampleStored { judge_name, .. }
            | MemoryEvent::ExampleDeleted { judge_name, .. }
            | MemoryEvent::PrincipleDiscovered { judge_name, .. }
            | MemoryEvent::PrincipleReinforced { judge_name, .. }
            | MemoryEvent::PrincipleUpdated { judge_name, .. }
            | MemoryEvent::PrincipleMerged { judge_name, .. }
            | MemoryEvent::PrincipleDeleted { judge_name, .. }
            | MemoryEvent::JudgmentRendered { judge_name, .. } => judge_name,
        }
    }
}
