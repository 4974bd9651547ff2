// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API transport for Courier.
//!
//! Implements [`MessageSender`](courier_core::MessageSender) for text, image,
//! and template messages. Template messages can carry a quick-reply button
//! payload, which is how unlock triggers reach the recipient.

pub mod client;
pub mod types;

pub use client::WhatsAppSender;
