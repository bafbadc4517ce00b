// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Streamed chat completions for Bastion writing suggestions.

mod client;
mod error;
mod stream;
mod types;

pub use client::{ChatCompletionClient, CompletionProvider, EventStream};
pub use error::{CompletionError, Result};
pub use stream::CompletionStream;
pub use types::*;
