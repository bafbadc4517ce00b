// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::error::AuditSinkError;
use crate::event::AuditLogEntry;
use crate::filter::AuditFilterConfig;
use crate::sink::AuditSink;

/// Persists entries to the `audit_logs` table.
pub struct SqliteAuditSink {
	pool: SqlitePool,
	filter: AuditFilterConfig,
}

impl SqliteAuditSink {
	pub fn new(pool: SqlitePool, filter: AuditFilterConfig) -> Self {
		Self { pool, filter }
	}
}

#[async_trait]
impl AuditSink for SqliteAuditSink {
	fn name(&self) -> &str {
		"sqlite"
	}

	fn filter(&self) -> &AuditFilterConfig {
		&self.filter
	}

	async fn publish(&self, entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		let details_json = serde_json::to_string(&entry.details)
			.map_err(|e| AuditSinkError::Permanent(format!("failed to serialize details: {e}")))?;

		sqlx::query(
			r#"
			INSERT INTO audit_logs (
				id, timestamp, event_type, severity, actor_user_id,
				resource_type, resource_id, action, ip_address, user_agent,
				request_id, details, created_at
			) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(entry.id.to_string())
		.bind(entry.timestamp.to_rfc3339())
		.bind(entry.event_type.as_str())
		.bind(entry.severity.as_str())
		.bind(entry.actor_user_id.map(|u| u.to_string()))
		.bind(&entry.resource_type)
		.bind(&entry.resource_id)
		.bind(&entry.action)
		.bind(&entry.ip_address)
		.bind(&entry.user_agent)
		.bind(&entry.request_id)
		.bind(&details_json)
		.bind(chrono::Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| {
			if is_transient_error(&e) {
				AuditSinkError::Transient(format!("database error: {e}"))
			} else {
				AuditSinkError::Permanent(format!("database error: {e}"))
			}
		})?;

		Ok(())
	}

	async fn health_check(&self) -> Result<(), AuditSinkError> {
		sqlx::query("SELECT 1")
			.execute(&self.pool)
			.await
			.map_err(|e| AuditSinkError::Transient(format!("health check failed: {e}")))?;
		Ok(())
	}
}

fn is_transient_error(e: &sqlx::Error) -> bool {
	match e {
		sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => true,
		sqlx::Error::Database(db_err) => {
			let msg = db_err.message().to_lowercase();
			msg.contains("busy") || msg.contains("locked")
		}
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::event::AuditEventType;
	use bastion_auth_core::UserId;
	use bastion_server_db::testing::create_test_pool;
	use sqlx::Row;

	#[tokio::test]
	async fn publish_writes_a_row() {
		let pool = create_test_pool().await;
		let sink = SqliteAuditSink::new(pool.clone(), AuditFilterConfig::default());
		let actor = UserId::generate();
		let entry = AuditLogEntry::builder(AuditEventType::RateLimited)
			.actor(actor)
			.resource("counter", "suggestions")
			.request_id("req-7")
			.details(serde_json::json!({ "limit": 50 }))
			.build();
		let id = entry.id;

		sink.publish(Arc::new(entry)).await.unwrap();

		let row = sqlx::query(
			"SELECT event_type, severity, actor_user_id, resource_id, request_id, details FROM audit_logs WHERE id = ?",
		)
		.bind(id.to_string())
		.fetch_one(&pool)
		.await
		.unwrap();
		assert_eq!(row.get::<String, _>("event_type"), "rate_limited");
		assert_eq!(row.get::<String, _>("severity"), "warning");
		assert_eq!(row.get::<String, _>("actor_user_id"), actor.to_string());
		assert_eq!(row.get::<String, _>("resource_id"), "suggestions");
		assert_eq!(row.get::<String, _>("request_id"), "req-7");
		assert_eq!(row.get::<String, _>("details"), r#"{"limit":50}"#);
	}

	#[tokio::test]
	async fn duplicate_id_is_permanent() {
		let pool = create_test_pool().await;
		let sink = SqliteAuditSink::new(pool, AuditFilterConfig::default());
		let entry = Arc::new(AuditLogEntry::builder(AuditEventType::SignIn).build());

		sink.publish(Arc::clone(&entry)).await.unwrap();
		let err = sink.publish(entry).await.unwrap_err();
		assert!(matches!(err, AuditSinkError::Permanent(_)));
	}

	#[tokio::test]
	async fn health_check_on_closed_pool_is_transient() {
		let pool = create_test_pool().await;
		let sink = SqliteAuditSink::new(pool.clone(), AuditFilterConfig::default());
		assert!(sink.health_check().await.is_ok());

		pool.close().await;
		assert!(matches!(
			sink.health_check().await,
			Err(AuditSinkError::Transient(_))
		));
	}
}
