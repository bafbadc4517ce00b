// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Per-user daily counters.

use async_trait::async_trait;
use bastion_auth_core::UserId;
use chrono::{NaiveDate, Utc};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;

#[async_trait]
pub trait UsageStore: Send + Sync {
	async fn get_count(&self, user_id: &UserId, day: NaiveDate, key: &str) -> Result<i64, DbError>;
	async fn increment_below(
		&self,
		user_id: &UserId,
		day: NaiveDate,
		key: &str,
		limit: i64,
	) -> Result<Option<i64>, DbError>;
}

#[derive(Clone)]
pub struct UsageRepository {
	pool: SqlitePool,
}

impl UsageRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id, day = %day))]
	pub async fn get_count(
		&self,
		user_id: &UserId,
		day: NaiveDate,
		key: &str,
	) -> Result<i64, DbError> {
		let row = sqlx::query(
			"SELECT count FROM daily_usage WHERE user_id = ? AND day = ? AND counter_key = ?",
		)
		.bind(user_id.to_string())
		.bind(day.to_string())
		.bind(key)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row.map(|r| r.get::<i64, _>("count")).unwrap_or(0))
	}

	/// Increment the counter unless it has already reached `limit`.
	///
	/// Check and increment happen in one statement, so concurrent requests
	/// cannot push the count past the limit.
	///
	/// # Returns
	/// The new count, or `None` when the limit was already reached.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, day = %day))]
	pub async fn increment_below(
		&self,
		user_id: &UserId,
		day: NaiveDate,
		key: &str,
		limit: i64,
	) -> Result<Option<i64>, DbError> {
		if limit <= 0 {
			return Ok(None);
		}

		let row = sqlx::query(
			r#"
			INSERT INTO daily_usage (user_id, day, counter_key, count, updated_at)
			VALUES (?, ?, ?, 1, ?)
			ON CONFLICT (user_id, day, counter_key)
			DO UPDATE SET count = count + 1, updated_at = excluded.updated_at
			WHERE daily_usage.count < ?
			RETURNING count
			"#,
		)
		.bind(user_id.to_string())
		.bind(day.to_string())
		.bind(key)
		.bind(Utc::now().to_rfc3339())
		.bind(limit)
		.fetch_optional(&self.pool)
		.await?;

		let count = row.map(|r| r.get::<i64, _>("count"));
		tracing::debug!(user_id = %user_id, key, ?count, "usage counter incremented");
		Ok(count)
	}
}

#[async_trait]
impl UsageStore for UsageRepository {
	async fn get_count(&self, user_id: &UserId, day: NaiveDate, key: &str) -> Result<i64, DbError> {
		self.get_count(user_id, day, key).await
	}

	async fn increment_below(
		&self,
		user_id: &UserId,
		day: NaiveDate,
		key: &str,
		limit: i64,
	) -> Result<Option<i64>, DbError> {
		self.increment_below(user_id, day, key, limit).await
	}
}
