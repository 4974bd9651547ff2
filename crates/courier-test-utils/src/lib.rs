// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Courier integration tests.
//!
//! Provides test doubles for fast, deterministic, CI-runnable tests without
//! a live messaging API.
//!
//! # Components
//!
//! - [`MockSender`] - Scriptable transport that records every call
//! - [`MemoryReportSink`] - Report sink that keeps everything in memory

pub mod memory_sink;
pub mod mock_sender;

pub use memory_sink::MemoryReportSink;
pub use mock_sender::{MockSender, SentMessage};
