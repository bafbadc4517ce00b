// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background profile reconciliation tuning.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
	pub queue_capacity: usize,
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
}

impl Default for ReconcileConfig {
	fn default() -> Self {
		ReconcileConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconcileConfigLayer {
	#[serde(default)]
	pub queue_capacity: Option<usize>,
	#[serde(default)]
	pub max_attempts: Option<u32>,
	#[serde(default)]
	pub base_delay_ms: Option<u64>,
	#[serde(default)]
	pub max_delay_ms: Option<u64>,
}

impl ReconcileConfigLayer {
	pub fn merge(&mut self, other: ReconcileConfigLayer) {
		if other.queue_capacity.is_some() {
			self.queue_capacity = other.queue_capacity;
		}
		if other.max_attempts.is_some() {
			self.max_attempts = other.max_attempts;
		}
		if other.base_delay_ms.is_some() {
			self.base_delay_ms = other.base_delay_ms;
		}
		if other.max_delay_ms.is_some() {
			self.max_delay_ms = other.max_delay_ms;
		}
	}

	pub fn finalize(self) -> ReconcileConfig {
		ReconcileConfig {
			queue_capacity: self.queue_capacity.unwrap_or(1024).max(1),
			max_attempts: self.max_attempts.unwrap_or(5).max(1),
			base_delay: Duration::from_millis(self.base_delay_ms.unwrap_or(250)),
			max_delay: Duration::from_millis(self.max_delay_ms.unwrap_or(10_000)),
		}
	}
}
