// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Daily usage limits.

use serde::Deserialize;

const DEFAULT_DAILY_SUGGESTION_LIMIT: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageConfig {
	pub daily_suggestion_limit: u32,
}

impl Default for UsageConfig {
	fn default() -> Self {
		UsageConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsageConfigLayer {
	#[serde(default)]
	pub daily_suggestion_limit: Option<u32>,
}

impl UsageConfigLayer {
	pub fn merge(&mut self, other: UsageConfigLayer) {
		if other.daily_suggestion_limit.is_some() {
			self.daily_suggestion_limit = other.daily_suggestion_limit;
		}
	}

	pub fn finalize(self) -> UsageConfig {
		UsageConfig {
			daily_suggestion_limit: self
				.daily_suggestion_limit
				.unwrap_or(DEFAULT_DAILY_SUGGESTION_LIMIT),
		}
	}
}
