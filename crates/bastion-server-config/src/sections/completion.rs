// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Completion API configuration for AI text suggestions.

use bastion_common_secret::SecretString;
use serde::Deserialize;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 500;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a writing assistant for security operations teams. \
	Improve clarity, structure and precision of the user's text. Keep technical terms intact \
	and never invent indicators, hostnames or credentials.";

#[derive(Debug, Clone)]
pub struct CompletionConfig {
	pub base_url: String,
	/// Suggestions are disabled when no key is configured.
	pub api_key: Option<SecretString>,
	pub model: String,
	pub temperature: f32,
	pub max_tokens: u32,
	pub system_prompt: String,
	pub timeout_secs: u64,
}

impl CompletionConfig {
	pub fn is_configured(&self) -> bool {
		self.api_key.is_some()
	}
}

impl Default for CompletionConfig {
	fn default() -> Self {
		CompletionConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompletionConfigLayer {
	#[serde(default)]
	pub base_url: Option<String>,
	#[serde(default)]
	pub api_key: Option<SecretString>,
	#[serde(default)]
	pub model: Option<String>,
	#[serde(default)]
	pub temperature: Option<f32>,
	#[serde(default)]
	pub max_tokens: Option<u32>,
	#[serde(default)]
	pub system_prompt: Option<String>,
	#[serde(default)]
	pub timeout_secs: Option<u64>,
}

impl CompletionConfigLayer {
	pub fn merge(&mut self, other: CompletionConfigLayer) {
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
		if other.api_key.is_some() {
			self.api_key = other.api_key;
		}
		if other.model.is_some() {
			self.model = other.model;
		}
		if other.temperature.is_some() {
			self.temperature = other.temperature;
		}
		if other.max_tokens.is_some() {
			self.max_tokens = other.max_tokens;
		}
		if other.system_prompt.is_some() {
			self.system_prompt = other.system_prompt;
		}
		if other.timeout_secs.is_some() {
			self.timeout_secs = other.timeout_secs;
		}
	}

	pub fn finalize(self) -> CompletionConfig {
		CompletionConfig {
			base_url: self
				.base_url
				.map(|u| u.trim_end_matches('/').to_string())
				.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
			api_key: self.api_key.filter(|k| !k.is_blank()),
			model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
			temperature: self
				.temperature
				.unwrap_or(DEFAULT_TEMPERATURE)
				.clamp(0.0, 2.0),
			max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
			system_prompt: self
				.system_prompt
				.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
			timeout_secs: self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
		}
	}
}
