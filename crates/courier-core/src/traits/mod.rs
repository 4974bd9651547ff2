// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the pluggable edges of the delivery core.

pub mod sender;

pub use sender::MessageSender;
