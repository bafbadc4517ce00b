// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Profile resolution.
//!
//! [`resolve_profile`] is pure and infallible: it always yields a complete
//! role/tier/plan triple and lists the store writes needed to make the stored
//! record match. Callers apply the writes asynchronously; the in-memory
//! result never depends on them succeeding.

use serde::Serialize;

use crate::profile::ProfileRecord;
use crate::role::{LegacyRole, Role, StoredRole};
use crate::subscription::{SubscriptionPlan, SubscriptionTier};
use crate::types::{TeamId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedProfile {
	pub role: Role,
	pub subscription_tier: SubscriptionTier,
	pub subscription_plan: SubscriptionPlan,
}

/// One field that must be written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileField {
	Role(Role),
	Tier(SubscriptionTier),
	Plan(SubscriptionPlan),
}

impl ReconcileField {
	pub fn column(&self) -> &'static str {
		match self {
			ReconcileField::Role(_) => "role",
			ReconcileField::Tier(_) => "subscription_tier",
			ReconcileField::Plan(_) => "subscription_plan",
		}
	}

	pub fn value(&self) -> &'static str {
		match self {
			ReconcileField::Role(r) => r.as_str(),
			ReconcileField::Tier(t) => t.as_str(),
			ReconcileField::Plan(p) => p.as_str(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileReason {
	LegacyRole(LegacyRole),
	Missing,
	DerivedFromPlan,
	DerivedFromTier,
}

impl ReconcileReason {
	pub fn as_str(&self) -> &'static str {
		match self {
			ReconcileReason::LegacyRole(_) => "legacy_role",
			ReconcileReason::Missing => "missing",
			ReconcileReason::DerivedFromPlan => "derived_from_plan",
			ReconcileReason::DerivedFromTier => "derived_from_tier",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
	pub user_id: UserId,
	pub field: ReconcileField,
	pub reason: ReconcileReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
	pub user_id: UserId,
	pub team_id: Option<TeamId>,
	pub profile: ResolvedProfile,
	pub reconciliations: Vec<Reconciliation>,
}

impl Resolution {
	pub fn is_clean(&self) -> bool {
		self.reconciliations.is_empty()
	}
}

pub fn resolve_profile(record: &ProfileRecord) -> Resolution {
	let mut writes = Vec::new();
	let mut push = |field, reason| {
		writes.push(Reconciliation {
			user_id: record.id,
			field,
			reason,
		})
	};

	let role = match record.role {
		Some(StoredRole::Legacy(legacy)) => {
			let mapped = legacy.to_current();
			push(ReconcileField::Role(mapped), ReconcileReason::LegacyRole(legacy));
			mapped
		}
		Some(StoredRole::Current(role)) => role,
		None => {
			push(ReconcileField::Role(Role::DEFAULT), ReconcileReason::Missing);
			Role::DEFAULT
		}
	};

	let stored_plan = record.subscription_plan.as_deref();
	let tier = match (record.subscription_tier, stored_plan) {
		(Some(tier), _) => tier,
		(None, Some(label)) => {
			let tier = SubscriptionPlan::tier_for_label(label);
			push(ReconcileField::Tier(tier), ReconcileReason::DerivedFromPlan);
			tier
		}
		(None, None) => {
			push(ReconcileField::Tier(SubscriptionTier::DEFAULT), ReconcileReason::Missing);
			SubscriptionTier::DEFAULT
		}
	};

	let plan = tier.plan();
	match stored_plan {
		None => push(ReconcileField::Plan(plan), ReconcileReason::Missing),
		Some(label) if label != plan.as_str() => {
			push(ReconcileField::Plan(plan), ReconcileReason::DerivedFromTier)
		}
		Some(_) => {}
	}

	Resolution {
		user_id: record.id,
		team_id: record.team_id,
		profile: ResolvedProfile {
			role,
			subscription_tier: tier,
			subscription_plan: plan,
		},
		reconciliations: writes,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::profile::StoredProfile;
	use proptest::prelude::*;

	fn record(role: Option<&str>, tier: Option<&str>, plan: Option<&str>) -> ProfileRecord {
		ProfileRecord::from(StoredProfile {
			role: role.map(String::from),
			subscription_tier: tier.map(String::from),
			subscription_plan: plan.map(String::from),
			..StoredProfile::new(UserId::generate())
		})
	}

	/// Applies writes to a record the way the store would.
	fn apply(mut record: ProfileRecord, writes: &[Reconciliation]) -> ProfileRecord {
		for w in writes {
			match w.field {
				ReconcileField::Role(r) => record.role = Some(StoredRole::Current(r)),
				ReconcileField::Tier(t) => record.subscription_tier = Some(t),
				ReconcileField::Plan(p) => record.subscription_plan = Some(p.as_str().to_string()),
			}
		}
		record
	}

	fn fields(resolution: &Resolution) -> Vec<&'static str> {
		resolution.reconciliations.iter().map(|r| r.field.column()).collect()
	}

	#[test]
	fn legacy_admin_without_subscription() {
		let resolution = resolve_profile(&record(Some("admin"), None, None));
		assert_eq!(
			resolution.profile,
			ResolvedProfile {
				role: Role::PlatformAdmin,
				subscription_tier: SubscriptionTier::Individual,
				subscription_plan: SubscriptionPlan::Free,
			}
		);
		assert_eq!(fields(&resolution), ["role", "subscription_tier", "subscription_plan"]);
		assert_eq!(
			resolution.reconciliations[0].reason,
			ReconcileReason::LegacyRole(LegacyRole::Admin)
		);
	}

	#[test]
	fn enterprise_tier_without_role() {
		let resolution = resolve_profile(&record(None, Some("enterprise"), Some("free")));
		assert_eq!(resolution.profile.role, Role::IndividualBasic);
		assert_eq!(resolution.profile.subscription_tier, SubscriptionTier::Enterprise);
		assert_eq!(resolution.profile.subscription_plan, SubscriptionPlan::Enterprise);
		assert_eq!(fields(&resolution), ["role", "subscription_plan"]);
		assert_eq!(resolution.reconciliations[1].reason, ReconcileReason::DerivedFromTier);
	}

	#[test]
	fn enterprise_tier_with_matching_plan_only_writes_role() {
		let resolution = resolve_profile(&record(None, Some("enterprise"), Some("enterprise")));
		assert_eq!(fields(&resolution), ["role"]);
	}

	#[test]
	fn plan_only_derives_tier() {
		for (plan, tier) in [
			("pro", SubscriptionTier::Professional),
			("team", SubscriptionTier::Smb),
			("enterprise", SubscriptionTier::Enterprise),
			("free", SubscriptionTier::Individual),
		] {
			let resolution = resolve_profile(&record(Some("team_lead"), None, Some(plan)));
			assert_eq!(resolution.profile.subscription_tier, tier, "{plan}");
			assert_eq!(fields(&resolution), ["subscription_tier"], "{plan}");
		}
	}

	#[test]
	fn unknown_plan_label_maps_to_individual_and_is_normalised() {
		let resolution = resolve_profile(&record(Some("team_lead"), None, Some("platinum")));
		assert_eq!(resolution.profile.subscription_tier, SubscriptionTier::Individual);
		assert_eq!(resolution.profile.subscription_plan, SubscriptionPlan::Free);
		assert_eq!(fields(&resolution), ["subscription_tier", "subscription_plan"]);
	}

	#[test]
	fn fully_current_record_is_clean() {
		let resolution = resolve_profile(&record(Some("team_red"), Some("smb"), Some("team")));
		assert!(resolution.is_clean());
		assert_eq!(resolution.profile.role, Role::TeamRed);
	}

	#[test]
	fn empty_record_gets_all_defaults() {
		let resolution = resolve_profile(&record(None, None, None));
		assert_eq!(resolution.profile.role, Role::IndividualBasic);
		assert_eq!(resolution.profile.subscription_tier, SubscriptionTier::Individual);
		assert_eq!(resolution.profile.subscription_plan, SubscriptionPlan::Free);
		assert_eq!(resolution.reconciliations.len(), 3);
		assert!(resolution
			.reconciliations
			.iter()
			.all(|r| r.reason == ReconcileReason::Missing));
	}

	fn opt_of(values: &'static [&'static str]) -> impl Strategy<Value = Option<&'static str>> {
		prop::option::of(prop::sample::select(values))
	}

	const ROLES: &[&str] = &[
		"admin", "manager", "editor", "analyst", "viewer", "user", "individual",
		"team_member", "team_manager", "administrator", "individual_basic",
		"individual_professional", "team_analyst", "team_hunter", "team_researcher", "team_red",
		"team_blue", "team_lead", "security_manager", "ciso_director", "platform_admin",
		"knowledge_admin", "bogus",
	];
	const TIERS: &[&str] = &["individual", "professional", "smb", "enterprise", "gold"];
	const PLANS: &[&str] = &["free", "pro", "team", "enterprise", "platinum"];

	proptest! {
		#[test]
		fn resolution_is_idempotent_after_writeback(
			role in opt_of(ROLES),
			tier in opt_of(TIERS),
			plan in opt_of(PLANS),
		) {
			let first_record = record(role, tier, plan);
			let first = resolve_profile(&first_record);
			let second = resolve_profile(&apply(first_record, &first.reconciliations));
			prop_assert!(second.is_clean(), "{:?}", second.reconciliations);
			prop_assert_eq!(second.profile, first.profile);
		}

		#[test]
		fn plan_always_follows_tier(
			role in opt_of(ROLES),
			tier in opt_of(TIERS),
			plan in opt_of(PLANS),
		) {
			let resolved = resolve_profile(&record(role, tier, plan)).profile;
			prop_assert_eq!(resolved.subscription_plan, resolved.subscription_tier.plan());
		}

		#[test]
		fn at_most_one_write_per_field(
			role in opt_of(ROLES),
			tier in opt_of(TIERS),
			plan in opt_of(PLANS),
		) {
			let cols = fields(&resolve_profile(&record(role, tier, plan)));
			let mut deduped = cols.clone();
			deduped.dedup();
			prop_assert_eq!(cols, deduped);
		}
	}
}
