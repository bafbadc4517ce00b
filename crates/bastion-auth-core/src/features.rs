// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Static part of the feature gate.
//!
//! Evaluation order per tier:
//! 1. prefix deny rules (first match wins),
//! 2. enterprise allows everything,
//! 3. anything else is undecided and goes to the remote rule lookup, whose
//!    failure or absence falls back to [`tier_fallback`].

use crate::subscription::SubscriptionTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticDecision {
	Deny { rule: &'static str },
	AllowEnterprise,
	Undecided,
}

enum Match {
	Prefix(&'static str),
	Exact(&'static str),
}

impl Match {
	fn matches(&self, key: &str) -> bool {
		match self {
			Match::Prefix(p) => key.starts_with(p),
			Match::Exact(e) => key == *e,
		}
	}

	fn label(&self) -> &'static str {
		match self {
			Match::Prefix(p) | Match::Exact(p) => *p,
		}
	}
}

const INDIVIDUAL_DENY: &[Match] = &[Match::Prefix("premium_")];
const PROFESSIONAL_DENY: &[Match] = &[Match::Prefix("enterprise_")];
const SMB_DENY: &[Match] = &[
	Match::Prefix("enterprise_advanced_"),
	Match::Exact("enterprise_unlimited_users"),
];

fn deny_rules(tier: SubscriptionTier) -> &'static [Match] {
	match tier {
		SubscriptionTier::Individual => INDIVIDUAL_DENY,
		SubscriptionTier::Professional => PROFESSIONAL_DENY,
		SubscriptionTier::Smb => SMB_DENY,
		SubscriptionTier::Enterprise => &[],
	}
}

pub fn static_decision(tier: SubscriptionTier, feature_key: &str) -> StaticDecision {
	if let Some(rule) = deny_rules(tier).iter().find(|m| m.matches(feature_key)) {
		return StaticDecision::Deny { rule: rule.label() };
	}
	if tier == SubscriptionTier::Enterprise {
		return StaticDecision::AllowEnterprise;
	}
	StaticDecision::Undecided
}

/// Used when no remote rule exists or the lookup fails.
pub fn tier_fallback(tier: SubscriptionTier) -> bool {
	tier != SubscriptionTier::Individual
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use SubscriptionTier::*;

	#[test]
	fn premium_features() {
		assert!(matches!(static_decision(Individual, "premium_x"), StaticDecision::Deny { .. }));
		assert_eq!(static_decision(Enterprise, "premium_x"), StaticDecision::AllowEnterprise);
		assert_eq!(static_decision(Professional, "premium_x"), StaticDecision::Undecided);
	}

	#[test]
	fn smb_unlimited_users_is_exact_match() {
		assert_eq!(
			static_decision(Smb, "enterprise_unlimited_users"),
			StaticDecision::Deny {
				rule: "enterprise_unlimited_users"
			}
		);
		assert_eq!(static_decision(Smb, "enterprise_unlimited_users_v2"), StaticDecision::Undecided);
		assert_eq!(
			static_decision(Smb, "enterprise_advanced_sso"),
			StaticDecision::Deny {
				rule: "enterprise_advanced_"
			}
		);
		assert_eq!(static_decision(Smb, "enterprise_sso"), StaticDecision::Undecided);
	}

	#[test]
	fn professional_loses_all_enterprise_features() {
		assert!(matches!(
			static_decision(Professional, "enterprise_sso"),
			StaticDecision::Deny { rule: "enterprise_" }
		));
	}

	#[test]
	fn prefix_rules_are_case_sensitive() {
		assert_eq!(static_decision(Individual, "PREMIUM_x"), StaticDecision::Undecided);
	}

	#[test]
	fn fallback_only_denies_individual() {
		assert!(!tier_fallback(Individual));
		assert!(tier_fallback(Professional));
		assert!(tier_fallback(Smb));
		assert!(tier_fallback(Enterprise));
	}

	proptest! {
		#[test]
		fn enterprise_always_allows(key in "[a-z_]{0,32}") {
			prop_assert_eq!(static_decision(Enterprise, &key), StaticDecision::AllowEnterprise);
		}

		#[test]
		fn individual_denies_every_premium_key(suffix in "[a-z_]{0,16}") {
			let key = format!("premium_{suffix}");
			let denied = matches!(static_decision(Individual, &key), StaticDecision::Deny { .. });
			prop_assert!(denied);
		}
	}
}
