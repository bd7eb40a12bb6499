// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: judges, the dual memory model, collaborator contracts and
//! the error taxonomy. No I/O happens here.

pub mod config;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod judge;
pub mod llm;
pub mod memory;
pub mod providers;
pub mod repository;
