// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Subscription-gated feature access.

use std::sync::Arc;

use bastion_auth_core::{static_decision, tier_fallback, StaticDecision, SubscriptionTier};
use bastion_server_db::FeatureRuleStore;
use serde::Serialize;
use tracing::{debug, instrument, warn};

/// Where an access decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "source")]
pub enum DecisionSource {
	StaticDeny { rule: &'static str },
	Enterprise,
	RemoteRule,
	Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureDecision {
	pub allowed: bool,
	#[serde(flatten)]
	pub source: DecisionSource,
}

pub struct FeatureGate {
	rules: Arc<dyn FeatureRuleStore>,
}

impl FeatureGate {
	pub fn new(rules: Arc<dyn FeatureRuleStore>) -> Self {
		Self { rules }
	}

	/// Evaluates tier deny rules, then the enterprise allowance, then the
	/// stored rule. A missing rule or failed lookup falls back to
	/// "any paid tier".
	#[instrument(skip(self), fields(tier = tier.as_str()))]
	pub async fn decide(&self, tier: SubscriptionTier, feature_key: &str) -> FeatureDecision {
		let decision = match static_decision(tier, feature_key) {
			StaticDecision::Deny { rule } => FeatureDecision {
				allowed: false,
				source: DecisionSource::StaticDeny { rule },
			},
			StaticDecision::AllowEnterprise => FeatureDecision {
				allowed: true,
				source: DecisionSource::Enterprise,
			},
			StaticDecision::Undecided => match self.rules.lookup_rule(tier, feature_key).await {
				Ok(Some(enabled)) => FeatureDecision {
					allowed: enabled,
					source: DecisionSource::RemoteRule,
				},
				Ok(None) => FeatureDecision {
					allowed: tier_fallback(tier),
					source: DecisionSource::Fallback,
				},
				Err(e) => {
					warn!(error = %e, "feature rule lookup failed, using tier fallback");
					FeatureDecision {
						allowed: tier_fallback(tier),
						source: DecisionSource::Fallback,
					}
				}
			},
		};

		debug!(
			allowed = decision.allowed,
			source = ?decision.source,
			"feature access decided"
		);
		decision
	}

	pub async fn has_feature_access(&self, tier: SubscriptionTier, feature_key: &str) -> bool {
		self.decide(tier, feature_key).await.allowed
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use bastion_server_db::testing::create_test_pool;
	use bastion_server_db::{DbError, FeatureRuleRepository};
	use std::sync::atomic::{AtomicUsize, Ordering};
	use SubscriptionTier::*;

	struct BrokenRules {
		lookups: AtomicUsize,
	}

	#[async_trait]
	impl FeatureRuleStore for BrokenRules {
		async fn lookup_rule(
			&self,
			_tier: SubscriptionTier,
			_feature_key: &str,
		) -> Result<Option<bool>, DbError> {
			self.lookups.fetch_add(1, Ordering::SeqCst);
			Err(DbError::Internal("unreachable".to_string()))
		}

		async fn upsert_rule(
			&self,
			_tier: SubscriptionTier,
			_feature_key: &str,
			_enabled: bool,
		) -> Result<(), DbError> {
			Err(DbError::Internal("unreachable".to_string()))
		}
	}

	async fn gate() -> (FeatureGate, Arc<FeatureRuleRepository>) {
		let repo = Arc::new(FeatureRuleRepository::new(create_test_pool().await));
		(FeatureGate::new(repo.clone()), repo)
	}

	#[tokio::test]
	async fn premium_is_denied_for_individual_and_allowed_for_enterprise() {
		let (gate, repo) = gate().await;
		repo.upsert_rule(Individual, "premium_x", true).await.unwrap();

		assert!(!gate.has_feature_access(Individual, "premium_x").await);
		assert!(gate.has_feature_access(Enterprise, "premium_x").await);
	}

	#[tokio::test]
	async fn smb_cannot_have_unlimited_users() {
		let (gate, _) = gate().await;
		let decision = gate.decide(Smb, "enterprise_unlimited_users").await;
		assert!(!decision.allowed);
		assert_eq!(
			decision.source,
			DecisionSource::StaticDeny { rule: "enterprise_unlimited_users" }
		);
		assert!(gate.has_feature_access(Smb, "enterprise_reporting").await);
	}

	#[tokio::test]
	async fn stored_rule_overrides_fallback() {
		let (gate, repo) = gate().await;
		repo.upsert_rule(Professional, "threat_feeds", false).await.unwrap();
		repo.upsert_rule(Individual, "threat_feeds", true).await.unwrap();

		let pro = gate.decide(Professional, "threat_feeds").await;
		assert_eq!((pro.allowed, pro.source), (false, DecisionSource::RemoteRule));
		assert!(gate.has_feature_access(Individual, "threat_feeds").await);
	}

	#[tokio::test]
	async fn missing_rule_falls_back_on_tier() {
		let (gate, _) = gate().await;
		let individual = gate.decide(Individual, "dark_mode").await;
		assert_eq!((individual.allowed, individual.source), (false, DecisionSource::Fallback));
		assert!(gate.has_feature_access(Professional, "dark_mode").await);
	}

	#[tokio::test]
	async fn lookup_failure_falls_back_and_enterprise_skips_lookup() {
		let rules = Arc::new(BrokenRules {
			lookups: AtomicUsize::new(0),
		});
		let gate = FeatureGate::new(rules.clone());

		assert!(!gate.has_feature_access(Individual, "dark_mode").await);
		assert!(gate.has_feature_access(Smb, "dark_mode").await);
		assert!(gate.has_feature_access(Enterprise, "dark_mode").await);
		assert!(!gate.has_feature_access(Individual, "premium_reports").await);
		assert_eq!(rules.lookups.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn decision_serializes_with_source() {
		let decision = FeatureDecision {
			allowed: false,
			source: DecisionSource::StaticDeny { rule: "premium_" },
		};
		let json = serde_json::to_value(decision).unwrap();
		assert_eq!(json["allowed"], false);
		assert_eq!(json["source"], "static_deny");
		assert_eq!(json["rule"], "premium_");
	}
}
