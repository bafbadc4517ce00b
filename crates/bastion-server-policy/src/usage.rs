// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-user daily usage limits, counted per UTC day.

use bastion_auth_core::UserId;
use bastion_server_db::UsageStore;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::error::PolicyError;

pub const SUGGESTIONS_COUNTER: &str = "suggestions";

/// Outcome of a successful [`DailyUsageLimiter::consume`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UsageGrant {
	pub used: u32,
	pub limit: u32,
	pub remaining: u32,
}

#[derive(Clone)]
pub struct DailyUsageLimiter {
	store: Arc<dyn UsageStore>,
	counter: &'static str,
	limit: u32,
}

impl DailyUsageLimiter {
	pub fn new(store: Arc<dyn UsageStore>, counter: &'static str, limit: u32) -> Self {
		Self {
			store,
			counter,
			limit,
		}
	}

	pub fn suggestions(store: Arc<dyn UsageStore>, limit: u32) -> Self {
		Self::new(store, SUGGESTIONS_COUNTER, limit)
	}

	pub fn limit(&self) -> u32 {
		self.limit
	}

	/// Count one use for `user_id` today.
	///
	/// # Errors
	/// `PolicyError::LimitReached` when today's count already equals the
	/// limit (nothing is counted), or `PolicyError::Store` if the counter
	/// could not be read or written.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, counter = self.counter, limit = self.limit))]
	pub async fn consume(&self, user_id: &UserId) -> Result<UsageGrant, PolicyError> {
		self.consume_at(user_id, Utc::now()).await
	}

	pub async fn consume_at(
		&self,
		user_id: &UserId,
		now: DateTime<Utc>,
	) -> Result<UsageGrant, PolicyError> {
		let day = utc_day(now);
		match self
			.store
			.increment_below(user_id, day, self.counter, i64::from(self.limit))
			.await?
		{
			Some(count) => {
				let used = u32::try_from(count).unwrap_or(u32::MAX);
				Ok(UsageGrant {
					used,
					limit: self.limit,
					remaining: self.limit.saturating_sub(used),
				})
			}
			None => {
				tracing::info!(user_id = %user_id, counter = self.counter, limit = self.limit, "daily limit reached");
				Err(PolicyError::LimitReached {
					counter: self.counter.to_string(),
					limit: self.limit,
				})
			}
		}
	}

	/// Uses remaining today, without counting one.
	pub async fn remaining(&self, user_id: &UserId) -> Result<u32, PolicyError> {
		let used = self
			.store
			.get_count(user_id, utc_day(Utc::now()), self.counter)
			.await?;
		let used = u32::try_from(used.max(0)).unwrap_or(u32::MAX);
		Ok(self.limit.saturating_sub(used))
	}
}

fn utc_day(now: DateTime<Utc>) -> NaiveDate {
	now.date_naive()
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use bastion_server_db::testing::create_test_pool;
	use bastion_server_db::{DbError, UsageRepository};
	use chrono::TimeZone;

	fn limiter(pool: bastion_server_db::SqlitePool, limit: u32) -> DailyUsageLimiter {
		DailyUsageLimiter::suggestions(Arc::new(UsageRepository::new(pool)), limit)
	}

	#[tokio::test]
	async fn allows_exactly_limit_uses_per_day() {
		let limiter = limiter(create_test_pool().await, 3);
		let user = UserId::generate();

		for expected in 1..=3 {
			let grant = limiter.consume(&user).await.unwrap();
			assert_eq!(grant.used, expected);
			assert_eq!(grant.remaining, 3 - expected);
		}

		let err = limiter.consume(&user).await.unwrap_err();
		assert!(matches!(
			err,
			PolicyError::LimitReached { limit: 3, ref counter } if counter == "suggestions"
		));
		assert_eq!(limiter.remaining(&user).await.unwrap(), 0);
	}

	#[tokio::test]
	async fn counter_resets_on_the_next_utc_day() {
		let limiter = limiter(create_test_pool().await, 1);
		let user = UserId::generate();
		let late = Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap();
		let next = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 1).unwrap();

		limiter.consume_at(&user, late).await.unwrap();
		assert!(limiter.consume_at(&user, late).await.is_err());
		assert_eq!(limiter.consume_at(&user, next).await.unwrap().used, 1);
	}

	#[tokio::test]
	async fn zero_limit_denies_everything() {
		let limiter = limiter(create_test_pool().await, 0);
		assert!(matches!(
			limiter.consume(&UserId::generate()).await,
			Err(PolicyError::LimitReached { .. })
		));
	}

	struct BrokenStore;

	#[async_trait]
	impl UsageStore for BrokenStore {
		async fn get_count(&self, _: &UserId, _: NaiveDate, _: &str) -> Result<i64, DbError> {
			Err(DbError::Internal("offline".into()))
		}

		async fn increment_below(
			&self,
			_: &UserId,
			_: NaiveDate,
			_: &str,
			_: i64,
		) -> Result<Option<i64>, DbError> {
			Err(DbError::Internal("offline".into()))
		}
	}

	#[tokio::test]
	async fn store_failure_is_not_a_limit() {
		let limiter = DailyUsageLimiter::suggestions(Arc::new(BrokenStore), 10);
		assert!(matches!(
			limiter.consume(&UserId::generate()).await,
			Err(PolicyError::Store(_))
		));
	}
}
