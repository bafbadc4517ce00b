// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Profile records at the store boundary.
//!
//! [`StoredProfile`] is the row exactly as persisted, all text. It is
//! validated once into a [`ProfileRecord`] before resolution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{check_text, ValidationError};
use crate::role::StoredRole;
use crate::subscription::SubscriptionTier;
use crate::types::{TeamId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredProfile {
	pub id: UserId,
	pub full_name: Option<String>,
	pub job_title: Option<String>,
	pub avatar_url: Option<String>,
	pub team_id: Option<TeamId>,
	pub role: Option<String>,
	pub subscription_tier: Option<String>,
	pub subscription_plan: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl StoredProfile {
	/// A fresh profile with no role or subscription fields.
	pub fn new(id: UserId) -> Self {
		let now = Utc::now();
		Self {
			id,
			full_name: None,
			job_title: None,
			avatar_url: None,
			team_id: None,
			role: None,
			subscription_tier: None,
			subscription_plan: None,
			created_at: now,
			updated_at: now,
		}
	}
}

/// Validated profile. Role and tier are typed; the plan keeps its raw label
/// since any label, known or not, still implies a tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileRecord {
	pub id: UserId,
	pub full_name: Option<String>,
	pub job_title: Option<String>,
	pub avatar_url: Option<String>,
	pub team_id: Option<TeamId>,
	pub role: Option<StoredRole>,
	pub subscription_tier: Option<SubscriptionTier>,
	pub subscription_plan: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.filter(|v| !v.trim().is_empty())
}

impl From<StoredProfile> for ProfileRecord {
	fn from(stored: StoredProfile) -> Self {
		let role = non_blank(stored.role).and_then(|raw| match raw.parse::<StoredRole>() {
			Ok(role) => Some(role),
			Err(_) => {
				warn!(user_id = %stored.id, role = %raw, "unrecognised stored role, treating as unset");
				None
			}
		});

		let subscription_tier =
			non_blank(stored.subscription_tier).and_then(|raw| match raw.parse() {
				Ok(tier) => Some(tier),
				Err(_) => {
					warn!(user_id = %stored.id, tier = %raw, "unrecognised stored tier, treating as unset");
					None
				}
			});

		Self {
			id: stored.id,
			full_name: stored.full_name,
			job_title: stored.job_title,
			avatar_url: stored.avatar_url,
			team_id: stored.team_id,
			role,
			subscription_tier,
			subscription_plan: non_blank(stored.subscription_plan),
		}
	}
}

/// Editable profile fields. `None` leaves a field unchanged; an empty string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
	#[serde(default)]
	pub full_name: Option<String>,
	#[serde(default)]
	pub job_title: Option<String>,
	#[serde(default)]
	pub avatar_url: Option<String>,
}

impl ProfileUpdate {
	pub fn is_empty(&self) -> bool {
		self.full_name.is_none() && self.job_title.is_none() && self.avatar_url.is_none()
	}

	pub fn validate(&self) -> Result<(), ValidationError> {
		if let Some(name) = &self.full_name {
			check_text("full_name", name, 120, false)?;
		}
		if let Some(title) = &self.job_title {
			check_text("job_title", title, 120, false)?;
		}
		if let Some(url) = &self.avatar_url {
			check_text("avatar_url", url, 2048, false)?;
			if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
				return Err(ValidationError::new("avatar_url", "must be an http(s) URL"));
			}
		}
		Ok(())
	}
}
