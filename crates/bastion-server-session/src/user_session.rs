// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use bastion_auth_core::{
	has_permission_keys, has_permissions, BasicRole, Permission, ProfileRecord, Resolution,
	ResolvedProfile, Role, SubscriptionPlan, SubscriptionTier, TeamId, UserId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything the UI knows about the signed-in user.
///
/// Built once at sign-in from a fully resolved profile and replaced on
/// refresh. Never holds partially defaulted data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserSession {
	pub user_id: UserId,
	pub full_name: Option<String>,
	pub job_title: Option<String>,
	pub avatar_url: Option<String>,
	pub team_id: Option<TeamId>,
	pub team_name: Option<String>,
	#[serde(flatten)]
	pub profile: ResolvedProfile,
	pub resolved_at: DateTime<Utc>,
}

impl UserSession {
	pub fn new(record: ProfileRecord, resolution: &Resolution, team_name: Option<String>) -> Self {
		Self {
			user_id: record.id,
			full_name: record.full_name,
			job_title: record.job_title,
			avatar_url: record.avatar_url,
			team_id: record.team_id,
			team_name,
			profile: resolution.profile,
			resolved_at: Utc::now(),
		}
	}

	pub fn role(&self) -> Role {
		self.profile.role
	}

	pub fn basic_role(&self) -> BasicRole {
		self.profile.role.basic()
	}

	pub fn tier(&self) -> SubscriptionTier {
		self.profile.subscription_tier
	}

	pub fn plan(&self) -> SubscriptionPlan {
		self.profile.subscription_plan
	}

	/// All of `required` must be held. An empty list is vacuously held.
	pub fn has_permissions(&self, required: &[Permission]) -> bool {
		has_permissions(Some(self.role()), required)
	}

	pub fn has_permission(&self, permission: Permission) -> bool {
		self.role().has_permission(permission)
	}

	/// String-keyed check. Unknown keys are never held.
	pub fn has_permission_keys<S: AsRef<str>>(&self, required: &[S]) -> bool {
		has_permission_keys(Some(self.role()), required)
	}

	/// Permission keys held by the resolved role.
	pub fn permission_keys(&self) -> Vec<&'static str> {
		self.role().permissions().iter().map(|p| p.key()).collect()
	}
}

/// Permission check against an optional session. No session holds nothing.
pub fn session_has_permissions(session: Option<&UserSession>, required: &[Permission]) -> bool {
	session.is_some_and(|s| s.has_permissions(required))
}
