// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! MemAlign Core
//!
//! Dual-memory alignment engine for LLM judges: episodic examples and
//! deduplicated semantic principles, assembled into working memory for each
//! judgment.
//!
//! # Architecture
//!
//! - **Domain:** judges, memory records, collaborator contracts, errors
//! - **Application:** semantic/episodic memory, alignment, judgment, service facade
//! - **Infrastructure:** vector index, repositories, embedders, LLM adapters
//! - **Presentation:** HTTP API

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
