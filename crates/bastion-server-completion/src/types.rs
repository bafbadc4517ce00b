// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Wire types for OpenAI-compatible chat completions.

use serde::{Deserialize, Serialize};

use crate::error::CompletionError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub role: String,
	pub content: String,
}

impl ChatMessage {
	pub fn system(content: impl Into<String>) -> Self {
		Self {
			role: "system".to_string(),
			content: content.into(),
		}
	}

	pub fn user(content: impl Into<String>) -> Self {
		Self {
			role: "user".to_string(),
			content: content.into(),
		}
	}
}

/// Request body for `POST {base_url}/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
	pub model: String,
	pub messages: Vec<ChatMessage>,
	pub temperature: f32,
	pub max_tokens: u32,
	pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamChunk {
	#[serde(default)]
	pub choices: Vec<StreamChoice>,
	#[serde(default)]
	pub usage: Option<ChunkUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamChoice {
	#[serde(default)]
	pub delta: StreamDelta,
	#[serde(default)]
	pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamDelta {
	#[serde(default)]
	pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkUsage {
	pub prompt_tokens: u32,
	pub completion_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
	pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
	pub message: String,
	#[serde(rename = "type", default)]
	pub error_type: Option<String>,
}

/// The finished suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
	pub content: String,
	pub finish_reason: Option<String>,
	pub usage: Option<ChunkUsage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionEvent {
	/// A fragment of generated text.
	Delta { content: String },
	Completed(Completion),
	Error(CompletionError),
}
