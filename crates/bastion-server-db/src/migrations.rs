// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const MIGRATIONS: &[(&str, &str)] = &[
	(
		"001_profiles_and_teams",
		include_str!("../migrations/001_profiles_and_teams.sql"),
	),
	(
		"002_tickets_and_documents",
		include_str!("../migrations/002_tickets_and_documents.sql"),
	),
	(
		"003_usage_and_audit",
		include_str!("../migrations/003_usage_and_audit.sql"),
	),
];

/// Apply the embedded schema. Every statement is idempotent, so running this
/// against an existing database is a no-op.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for (name, sql) in MIGRATIONS {
		for stmt in sql.split(';').filter(|s| !s.trim().is_empty()) {
			if let Err(e) = sqlx::query(stmt).execute(pool).await {
				let msg = e.to_string();
				if !msg.contains("already exists") && !msg.contains("duplicate column") {
					tracing::error!(migration = name, error = %e, "migration failed");
					return Err(e.into());
				}
			}
		}
		tracing::debug!(migration = name, "migration applied");
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use sqlx::Row;

	#[tokio::test]
	async fn migrations_create_every_table() {
		let pool = crate::testing::create_test_pool().await;

		let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
			.fetch_all(&pool)
			.await
			.unwrap();
		let names: Vec<String> = rows.iter().map(|r| r.get("name")).collect();

		for table in [
			"profiles",
			"teams",
			"team_memberships",
			"feature_rules",
			"auth_sessions",
			"tickets",
			"ticket_activity",
			"documents",
			"daily_usage",
			"audit_logs",
		] {
			assert!(names.iter().any(|n| n == table), "missing table {table}");
		}
	}

	#[tokio::test]
	async fn migrations_are_rerunnable() {
		let pool = crate::testing::create_test_pool().await;
		run_migrations(&pool).await.unwrap();
		run_migrations(&pool).await.unwrap();
	}
}
