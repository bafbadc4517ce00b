// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bastion sign-in sessions. Only the SHA-256 hash of a bearer token is
//! ever stored.

use async_trait::async_trait;
use bastion_auth_core::{AuthSessionId, UserId};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::row::{parse_column, parse_timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSessionRecord {
	pub id: AuthSessionId,
	pub user_id: UserId,
	pub token_hash: String,
	pub created_at: DateTime<Utc>,
	pub last_used_at: DateTime<Utc>,
	pub expires_at: DateTime<Utc>,
}

impl AuthSessionRecord {
	pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
		self.expires_at <= now
	}
}

#[async_trait]
pub trait AuthSessionStore: Send + Sync {
	async fn create_session(&self, session: &AuthSessionRecord) -> Result<(), DbError>;
	async fn get_session_by_token_hash(
		&self,
		token_hash: &str,
	) -> Result<Option<AuthSessionRecord>, DbError>;
	async fn touch_session(
		&self,
		id: &AuthSessionId,
		expires_at: DateTime<Utc>,
	) -> Result<(), DbError>;
	async fn delete_session(&self, id: &AuthSessionId) -> Result<bool, DbError>;
	async fn delete_expired_sessions(&self) -> Result<Vec<AuthSessionId>, DbError>;
}

#[derive(Clone)]
pub struct AuthSessionRepository {
	pool: SqlitePool,
}

impl AuthSessionRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, session), fields(session_id = %session.id, user_id = %session.user_id))]
	pub async fn create_session(&self, session: &AuthSessionRecord) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO auth_sessions (id, user_id, token_hash, created_at, last_used_at, expires_at)
			VALUES (?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(session.id.to_string())
		.bind(session.user_id.to_string())
		.bind(&session.token_hash)
		.bind(session.created_at.to_rfc3339())
		.bind(session.last_used_at.to_rfc3339())
		.bind(session.expires_at.to_rfc3339())
		.execute(&self.pool)
		.await?;

		tracing::debug!(session_id = %session.id, "auth session created");
		Ok(())
	}

	#[tracing::instrument(skip(self, token_hash))]
	pub async fn get_session_by_token_hash(
		&self,
		token_hash: &str,
	) -> Result<Option<AuthSessionRecord>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, user_id, token_hash, created_at, last_used_at, expires_at
			FROM auth_sessions
			WHERE token_hash = ?
			"#,
		)
		.bind(token_hash)
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_session(&r)).transpose()
	}

	/// Record use and slide the expiry forward.
	#[tracing::instrument(skip(self), fields(session_id = %id))]
	pub async fn touch_session(
		&self,
		id: &AuthSessionId,
		expires_at: DateTime<Utc>,
	) -> Result<(), DbError> {
		sqlx::query("UPDATE auth_sessions SET last_used_at = ?, expires_at = ? WHERE id = ?")
			.bind(Utc::now().to_rfc3339())
			.bind(expires_at.to_rfc3339())
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(session_id = %id))]
	pub async fn delete_session(&self, id: &AuthSessionId) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM auth_sessions WHERE id = ?")
			.bind(id.to_string())
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	/// Returns the ids of the removed sessions.
	#[tracing::instrument(skip(self))]
	pub async fn delete_expired_sessions(&self) -> Result<Vec<AuthSessionId>, DbError> {
		let rows = sqlx::query("DELETE FROM auth_sessions WHERE expires_at <= ? RETURNING id")
			.bind(Utc::now().to_rfc3339())
			.fetch_all(&self.pool)
			.await?;

		let removed = rows
			.iter()
			.map(|r| {
				let id: String = r.get("id");
				parse_column(&id, "session id")
			})
			.collect::<Result<Vec<AuthSessionId>, DbError>>()?;
		if !removed.is_empty() {
			tracing::info!(removed = removed.len(), "expired auth sessions removed");
		}
		Ok(removed)
	}
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<AuthSessionRecord, DbError> {
	let id: String = row.get("id");
	let user_id: String = row.get("user_id");
	let created_at: String = row.get("created_at");
	let last_used_at: String = row.get("last_used_at");
	let expires_at: String = row.get("expires_at");

	Ok(AuthSessionRecord {
		id: parse_column(&id, "session id")?,
		user_id: parse_column(&user_id, "user_id")?,
		token_hash: row.get("token_hash"),
		created_at: parse_timestamp(&created_at, "created_at")?,
		last_used_at: parse_timestamp(&last_used_at, "last_used_at")?,
		expires_at: parse_timestamp(&expires_at, "expires_at")?,
	})
}

#[async_trait]
impl AuthSessionStore for AuthSessionRepository {
	async fn create_session(&self, session: &AuthSessionRecord) -> Result<(), DbError> {
		self.create_session(session).await
	}

	async fn get_session_by_token_hash(
		&self,
		token_hash: &str,
	) -> Result<Option<AuthSessionRecord>, DbError> {
		self.get_session_by_token_hash(token_hash).await
	}

	async fn touch_session(
		&self,
		id: &AuthSessionId,
		expires_at: DateTime<Utc>,
	) -> Result<(), DbError> {
		self.touch_session(id, expires_at).await
	}

	async fn delete_session(&self, id: &AuthSessionId) -> Result<bool, DbError> {
		self.delete_session(id).await
	}

	async fn delete_expired_sessions(&self) -> Result<Vec<AuthSessionId>, DbError> {
		self.delete_expired_sessions().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{create_test_pool, insert_user};
	use chrono::Duration;

	fn record(user_id: UserId, hash: &str, expires_in: Duration) -> AuthSessionRecord {
		let now = Utc::now();
		AuthSessionRecord {
			id: AuthSessionId::generate(),
			user_id,
			token_hash: hash.to_string(),
			created_at: now,
			last_used_at: now,
			expires_at: now + expires_in,
		}
	}

	#[tokio::test]
	async fn lookup_by_token_hash() {
		let pool = create_test_pool().await;
		let repo = AuthSessionRepository::new(pool.clone());
		let user_id = insert_user(&pool).await;
		let session = record(user_id, "abc123", Duration::days(30));

		repo.create_session(&session).await.unwrap();

		let loaded = repo.get_session_by_token_hash("abc123").await.unwrap().unwrap();
		assert_eq!(loaded.id, session.id);
		assert_eq!(loaded.user_id, user_id);
		assert!(repo.get_session_by_token_hash("nope").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn touch_slides_expiry() {
		let pool = create_test_pool().await;
		let repo = AuthSessionRepository::new(pool.clone());
		let user_id = insert_user(&pool).await;
		let session = record(user_id, "slide", Duration::days(1));
		repo.create_session(&session).await.unwrap();

		let later = Utc::now() + Duration::days(30);
		repo.touch_session(&session.id, later).await.unwrap();

		let loaded = repo.get_session_by_token_hash("slide").await.unwrap().unwrap();
		assert!(loaded.expires_at > session.expires_at);
	}

	#[tokio::test]
	async fn expired_sessions_are_purged() {
		let pool = create_test_pool().await;
		let repo = AuthSessionRepository::new(pool.clone());
		let user_id = insert_user(&pool).await;

		let stale = record(user_id, "stale", Duration::seconds(-5));
		assert!(stale.is_expired(Utc::now()));
		repo.create_session(&stale).await.unwrap();
		repo.create_session(&record(user_id, "fresh", Duration::days(1)))
			.await
			.unwrap();

		assert_eq!(repo.delete_expired_sessions().await.unwrap(), vec![stale.id]);
		assert!(repo.delete_expired_sessions().await.unwrap().is_empty());
		assert!(repo.get_session_by_token_hash("stale").await.unwrap().is_none());
		assert!(repo.get_session_by_token_hash("fresh").await.unwrap().is_some());
	}

	#[tokio::test]
	async fn delete_session_reports_removal() {
		let pool = create_test_pool().await;
		let repo = AuthSessionRepository::new(pool.clone());
		let user_id = insert_user(&pool).await;
		let session = record(user_id, "bye", Duration::days(1));
		repo.create_session(&session).await.unwrap();

		assert!(repo.delete_session(&session.id).await.unwrap());
		assert!(!repo.delete_session(&session.id).await.unwrap());
	}
}
