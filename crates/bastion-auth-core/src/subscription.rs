// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subscription tiers and their legacy plan labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
	Individual,
	Professional,
	Smb,
	Enterprise,
}

impl SubscriptionTier {
	pub const DEFAULT: SubscriptionTier = SubscriptionTier::Individual;

	pub fn all() -> &'static [SubscriptionTier] {
		&[
			SubscriptionTier::Individual,
			SubscriptionTier::Professional,
			SubscriptionTier::Smb,
			SubscriptionTier::Enterprise,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			SubscriptionTier::Individual => "individual",
			SubscriptionTier::Professional => "professional",
			SubscriptionTier::Smb => "smb",
			SubscriptionTier::Enterprise => "enterprise",
		}
	}

	/// Legacy label for this tier. Total.
	pub fn plan(&self) -> SubscriptionPlan {
		match self {
			SubscriptionTier::Individual => SubscriptionPlan::Free,
			SubscriptionTier::Professional => SubscriptionPlan::Pro,
			SubscriptionTier::Smb => SubscriptionPlan::Team,
			SubscriptionTier::Enterprise => SubscriptionPlan::Enterprise,
		}
	}
}

impl fmt::Display for SubscriptionTier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SubscriptionTier {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		SubscriptionTier::all()
			.iter()
			.copied()
			.find(|t| t.as_str() == s)
			.ok_or_else(|| ParseEnumError::new("subscription tier", s))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
	Free,
	Pro,
	Team,
	Enterprise,
}

impl SubscriptionPlan {
	pub fn all() -> &'static [SubscriptionPlan] {
		&[
			SubscriptionPlan::Free,
			SubscriptionPlan::Pro,
			SubscriptionPlan::Team,
			SubscriptionPlan::Enterprise,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			SubscriptionPlan::Free => "free",
			SubscriptionPlan::Pro => "pro",
			SubscriptionPlan::Team => "team",
			SubscriptionPlan::Enterprise => "enterprise",
		}
	}

	/// Tier implied by a plan when no tier is stored.
	pub fn tier(&self) -> SubscriptionTier {
		match self {
			SubscriptionPlan::Pro => SubscriptionTier::Professional,
			SubscriptionPlan::Team => SubscriptionTier::Smb,
			SubscriptionPlan::Enterprise => SubscriptionTier::Enterprise,
			SubscriptionPlan::Free => SubscriptionTier::Individual,
		}
	}

	/// Like [`SubscriptionPlan::tier`] but for raw labels; unknown labels map to `individual`.
	pub fn tier_for_label(label: &str) -> SubscriptionTier {
		label
			.parse::<SubscriptionPlan>()
			.map(|p| p.tier())
			.unwrap_or(SubscriptionTier::Individual)
	}
}

impl fmt::Display for SubscriptionPlan {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SubscriptionPlan {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		SubscriptionPlan::all()
			.iter()
			.copied()
			.find(|p| p.as_str() == s)
			.ok_or_else(|| ParseEnumError::new("subscription plan", s))
	}
}
