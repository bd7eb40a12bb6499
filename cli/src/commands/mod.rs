// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the MemAlign CLI

pub mod align;
pub mod config;
pub mod evaluate;
pub mod judge;
pub mod memory;

pub use self::align::{AlignArgs, AlignBatchArgs, AlignInteractiveArgs};
pub use self::config::ConfigCommand;
pub use self::evaluate::{EvaluateArgs, EvaluateBatchArgs};
pub use self::judge::JudgeCommand;
pub use self::memory::{ExampleCommand, PrincipleCommand};
