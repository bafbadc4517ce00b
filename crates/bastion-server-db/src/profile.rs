// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Profile repository.
//!
//! Rows are returned as raw [`StoredProfile`]s; validation into a typed
//! record happens in `bastion-auth-core`.

use async_trait::async_trait;
use bastion_auth_core::{ProfileUpdate, Reconciliation, StoredProfile, TeamId, UserId};
use chrono::Utc;
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::row::{nullable_text, parse_column, parse_optional, parse_timestamp};

#[async_trait]
pub trait ProfileStore: Send + Sync {
	async fn get_profile(&self, user_id: &UserId) -> Result<Option<StoredProfile>, DbError>;
	async fn create_profile(&self, profile: &StoredProfile) -> Result<(), DbError>;
	async fn ensure_profile(&self, user_id: &UserId) -> Result<bool, DbError>;
	async fn update_profile(&self, user_id: &UserId, update: &ProfileUpdate) -> Result<(), DbError>;
	async fn apply_reconciliation(&self, reconciliation: &Reconciliation) -> Result<(), DbError>;
	async fn set_team(&self, user_id: &UserId, team_id: Option<&TeamId>) -> Result<(), DbError>;
	async fn clear_team_if(&self, user_id: &UserId, team_id: &TeamId) -> Result<bool, DbError>;
}

#[derive(Clone)]
pub struct ProfileRepository {
	pool: SqlitePool,
}

impl ProfileRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn get_profile(&self, user_id: &UserId) -> Result<Option<StoredProfile>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, full_name, job_title, avatar_url, team_id, role,
				subscription_tier, subscription_plan, created_at, updated_at
			FROM profiles
			WHERE id = ?
			"#,
		)
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_profile(&r)).transpose()
	}

	/// # Errors
	/// Returns `DbError::Conflict` if a profile with this id already exists.
	#[tracing::instrument(skip(self, profile), fields(user_id = %profile.id))]
	pub async fn create_profile(&self, profile: &StoredProfile) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO profiles (id, full_name, job_title, avatar_url, team_id, role,
				subscription_tier, subscription_plan, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(profile.id.to_string())
		.bind(&profile.full_name)
		.bind(&profile.job_title)
		.bind(&profile.avatar_url)
		.bind(profile.team_id.map(|t| t.to_string()))
		.bind(&profile.role)
		.bind(&profile.subscription_tier)
		.bind(&profile.subscription_plan)
		.bind(profile.created_at.to_rfc3339())
		.bind(profile.updated_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| {
			if DbError::is_unique_violation(&e) {
				DbError::Conflict(format!("profile {} already exists", profile.id))
			} else {
				e.into()
			}
		})?;

		tracing::debug!(user_id = %profile.id, "profile created");
		Ok(())
	}

	/// Insert an empty profile for a first-time identity.
	///
	/// # Returns
	/// `true` when a row was created, `false` when one already existed.
	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn ensure_profile(&self, user_id: &UserId) -> Result<bool, DbError> {
		let now = Utc::now().to_rfc3339();
		let result = sqlx::query(
			r#"
			INSERT OR IGNORE INTO profiles (id, created_at, updated_at)
			VALUES (?, ?, ?)
			"#,
		)
		.bind(user_id.to_string())
		.bind(&now)
		.bind(&now)
		.execute(&self.pool)
		.await?;

		let created = result.rows_affected() > 0;
		if created {
			tracing::debug!(user_id = %user_id, "profile provisioned");
		}
		Ok(created)
	}

	/// Apply the editable fields of `update`; `None` fields are left alone and
	/// blank strings clear the column.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if no profile exists.
	#[tracing::instrument(skip(self, update), fields(user_id = %user_id))]
	pub async fn update_profile(
		&self,
		user_id: &UserId,
		update: &ProfileUpdate,
	) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
			UPDATE profiles SET
				full_name = CASE WHEN ? THEN ? ELSE full_name END,
				job_title = CASE WHEN ? THEN ? ELSE job_title END,
				avatar_url = CASE WHEN ? THEN ? ELSE avatar_url END,
				updated_at = ?
			WHERE id = ?
			"#,
		)
		.bind(update.full_name.is_some())
		.bind(update.full_name.as_deref().and_then(nullable_text))
		.bind(update.job_title.is_some())
		.bind(update.job_title.as_deref().and_then(nullable_text))
		.bind(update.avatar_url.is_some())
		.bind(update.avatar_url.as_deref().and_then(nullable_text))
		.bind(Utc::now().to_rfc3339())
		.bind(user_id.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("profile {user_id}")));
		}

		tracing::debug!(user_id = %user_id, "profile updated");
		Ok(())
	}

	/// Write back one resolved field.
	///
	/// # Errors
	/// Returns `DbError::NotFound` if the profile disappeared.
	#[tracing::instrument(
		skip(self, reconciliation),
		fields(
			user_id = %reconciliation.user_id,
			column = reconciliation.field.column(),
			reason = reconciliation.reason.as_str()
		)
	)]
	pub async fn apply_reconciliation(&self, reconciliation: &Reconciliation) -> Result<(), DbError> {
		// Column names come from a closed set, never from input.
		let sql = format!(
			"UPDATE profiles SET {} = ?, updated_at = ? WHERE id = ?",
			reconciliation.field.column()
		);
		let result = sqlx::query(&sql)
			.bind(reconciliation.field.value())
			.bind(Utc::now().to_rfc3339())
			.bind(reconciliation.user_id.to_string())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!(
				"profile {}",
				reconciliation.user_id
			)));
		}

		tracing::debug!(
			user_id = %reconciliation.user_id,
			column = reconciliation.field.column(),
			value = reconciliation.field.value(),
			"profile field reconciled"
		);
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(user_id = %user_id))]
	pub async fn set_team(&self, user_id: &UserId, team_id: Option<&TeamId>) -> Result<(), DbError> {
		let result = sqlx::query("UPDATE profiles SET team_id = ?, updated_at = ? WHERE id = ?")
			.bind(team_id.map(|t| t.to_string()))
			.bind(Utc::now().to_rfc3339())
			.bind(user_id.to_string())
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::NotFound(format!("profile {user_id}")));
		}
		Ok(())
	}

	/// Clear the team reference only while it still points at `team_id`.
	#[tracing::instrument(skip(self), fields(user_id = %user_id, team_id = %team_id))]
	pub async fn clear_team_if(&self, user_id: &UserId, team_id: &TeamId) -> Result<bool, DbError> {
		let result = sqlx::query(
			"UPDATE profiles SET team_id = NULL, updated_at = ? WHERE id = ? AND team_id = ?",
		)
		.bind(Utc::now().to_rfc3339())
		.bind(user_id.to_string())
		.bind(team_id.to_string())
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}
}

fn row_to_profile(row: &sqlx::sqlite::SqliteRow) -> Result<StoredProfile, DbError> {
	let id: String = row.get("id");
	let team_id: Option<String> = row.get("team_id");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(StoredProfile {
		id: parse_column(&id, "profile id")?,
		full_name: row.get("full_name"),
		job_title: row.get("job_title"),
		avatar_url: row.get("avatar_url"),
		team_id: parse_optional(team_id, "team_id")?,
		role: row.get("role"),
		subscription_tier: row.get("subscription_tier"),
		subscription_plan: row.get("subscription_plan"),
		created_at: parse_timestamp(&created_at, "created_at")?,
		updated_at: parse_timestamp(&updated_at, "updated_at")?,
	})
}

#[async_trait]
impl ProfileStore for ProfileRepository {
	async fn get_profile(&self, user_id: &UserId) -> Result<Option<StoredProfile>, DbError> {
		self.get_profile(user_id).await
	}

	async fn create_profile(&self, profile: &StoredProfile) -> Result<(), DbError> {
		self.create_profile(profile).await
	}

	async fn ensure_profile(&self, user_id: &UserId) -> Result<bool, DbError> {
		self.ensure_profile(user_id).await
	}

	async fn update_profile(&self, user_id: &UserId, update: &ProfileUpdate) -> Result<(), DbError> {
		self.update_profile(user_id, update).await
	}

	async fn apply_reconciliation(&self, reconciliation: &Reconciliation) -> Result<(), DbError> {
		self.apply_reconciliation(reconciliation).await
	}

	async fn set_team(&self, user_id: &UserId, team_id: Option<&TeamId>) -> Result<(), DbError> {
		self.set_team(user_id, team_id).await
	}

	async fn clear_team_if(&self, user_id: &UserId, team_id: &TeamId) -> Result<bool, DbError> {
		self.clear_team_if(user_id, team_id).await
	}
}
