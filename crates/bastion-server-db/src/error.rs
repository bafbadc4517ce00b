// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use bastion_common_http::RetryableError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Internal: {0}")]
	Internal(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl DbError {
	pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
		matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
	}
}

/// Busy/locked databases and pool exhaustion clear up on their own; anything
/// else will fail the same way again.
impl RetryableError for DbError {
	fn is_retryable(&self) -> bool {
		match self {
			DbError::Sqlx(sqlx::Error::Io(_))
			| DbError::Sqlx(sqlx::Error::PoolTimedOut)
			| DbError::Sqlx(sqlx::Error::PoolClosed) => true,
			DbError::Sqlx(sqlx::Error::Database(db)) => {
				let msg = db.message().to_lowercase();
				msg.contains("busy") || msg.contains("locked")
			}
			_ => false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pool_timeouts_are_retryable() {
		assert!(DbError::Sqlx(sqlx::Error::PoolTimedOut).is_retryable());
		assert!(DbError::Sqlx(sqlx::Error::PoolClosed).is_retryable());
	}

	#[test]
	fn logical_errors_are_not_retryable() {
		assert!(!DbError::NotFound("profile".into()).is_retryable());
		assert!(!DbError::Conflict("membership".into()).is_retryable());
		assert!(!DbError::Sqlx(sqlx::Error::RowNotFound).is_retryable());
	}
}
