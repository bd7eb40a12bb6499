// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! MemAlign CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Command handlers, in-process service construction, HTTP server

pub mod commands;
pub mod embedded;
pub mod output;
pub mod server;
