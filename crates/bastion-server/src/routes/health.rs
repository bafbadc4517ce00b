// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
	Healthy,
	Unhealthy,
	Disabled,
}

#[derive(Debug, Serialize)]
pub struct HealthComponents {
	pub database: ComponentStatus,
	pub audit: ComponentStatus,
	pub completion: ComponentStatus,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: ComponentStatus,
	pub timestamp: String,
	pub version: &'static str,
	pub duration_ms: u64,
	pub components: HealthComponents,
}

/// GET /health
///
/// The completion API being unconfigured does not make the server unhealthy.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let start = tokio::time::Instant::now();

	let (database, audit) = tokio::join!(
		async {
			match sqlx::query("SELECT 1").execute(&state.pool).await {
				Ok(_) => ComponentStatus::Healthy,
				Err(e) => {
					tracing::warn!(error = %e, "database health check failed");
					ComponentStatus::Unhealthy
				}
			}
		},
		async {
			match state.audit.health_check().await {
				Ok(()) => ComponentStatus::Healthy,
				Err(e) => {
					tracing::warn!(error = %e, "audit health check failed");
					ComponentStatus::Unhealthy
				}
			}
		}
	);
	let completion = if state.completion.is_some() {
		ComponentStatus::Healthy
	} else {
		ComponentStatus::Disabled
	};

	let status = if database == ComponentStatus::Healthy && audit == ComponentStatus::Healthy {
		ComponentStatus::Healthy
	} else {
		ComponentStatus::Unhealthy
	};
	let http_status = match status {
		ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
		_ => StatusCode::OK,
	};

	let response = HealthResponse {
		status,
		timestamp: chrono::Utc::now().to_rfc3339(),
		version: env!("CARGO_PKG_VERSION"),
		duration_ms: start.elapsed().as_millis() as u64,
		components: HealthComponents {
			database,
			audit,
			completion,
		},
	};

	(http_status, Json(response))
}
