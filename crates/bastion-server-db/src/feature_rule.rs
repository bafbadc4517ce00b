// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Remote feature rules, keyed by subscription tier and feature key.

use async_trait::async_trait;
use bastion_auth_core::SubscriptionTier;
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;

#[async_trait]
pub trait FeatureRuleStore: Send + Sync {
	async fn lookup_rule(
		&self,
		tier: SubscriptionTier,
		feature_key: &str,
	) -> Result<Option<bool>, DbError>;
	async fn upsert_rule(
		&self,
		tier: SubscriptionTier,
		feature_key: &str,
		enabled: bool,
	) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct FeatureRuleRepository {
	pool: SqlitePool,
}

impl FeatureRuleRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// # Returns
	/// `None` when no rule exists for this tier and key.
	#[tracing::instrument(skip(self), fields(tier = tier.as_str()))]
	pub async fn lookup_rule(
		&self,
		tier: SubscriptionTier,
		feature_key: &str,
	) -> Result<Option<bool>, DbError> {
		let row = sqlx::query(
			"SELECT enabled FROM feature_rules WHERE subscription_tier = ? AND feature_key = ?",
		)
		.bind(tier.as_str())
		.bind(feature_key)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row.map(|r| r.get::<i64, _>("enabled") != 0))
	}

	#[tracing::instrument(skip(self), fields(tier = tier.as_str()))]
	pub async fn upsert_rule(
		&self,
		tier: SubscriptionTier,
		feature_key: &str,
		enabled: bool,
	) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO feature_rules (subscription_tier, feature_key, enabled, updated_at)
			VALUES (?, ?, ?, ?)
			ON CONFLICT (subscription_tier, feature_key)
			DO UPDATE SET enabled = excluded.enabled, updated_at = excluded.updated_at
			"#,
		)
		.bind(tier.as_str())
		.bind(feature_key)
		.bind(enabled as i64)
		.bind(Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(tier = tier.as_str(), feature_key, enabled, "feature rule stored");
		Ok(())
	}
}

#[async_trait]
impl FeatureRuleStore for FeatureRuleRepository {
	async fn lookup_rule(
		&self,
		tier: SubscriptionTier,
		feature_key: &str,
	) -> Result<Option<bool>, DbError> {
		self.lookup_rule(tier, feature_key).await
	}

	async fn upsert_rule(
		&self,
		tier: SubscriptionTier,
		feature_key: &str,
		enabled: bool,
	) -> Result<(), DbError> {
		self.upsert_rule(tier, feature_key, enabled).await
	}
}
