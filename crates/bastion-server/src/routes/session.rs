// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The signed-in user's session, profile, permissions and feature flags.

use axum::{
	extract::{Path, State},
	Json,
};
use bastion_auth_core::ProfileUpdate;
use bastion_server_audit::{AuditEventType, AuditLogEntry, AuditSeverity};
use bastion_server_session::{FeatureDecision, UserSession};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::AppState;
use crate::auth_middleware::RequireAuth;
use crate::error::ServerError;
use crate::routes::sync_sessions;

#[derive(Debug, Serialize)]
pub struct SessionResponse {
	pub session: UserSession,
	pub permissions: Vec<&'static str>,
}

impl From<UserSession> for SessionResponse {
	fn from(session: UserSession) -> Self {
		let permissions = session.permission_keys();
		Self {
			session,
			permissions,
		}
	}
}

/// GET /api/session
pub async fn get_session(RequireAuth(user): RequireAuth) -> Json<SessionResponse> {
	Json(user.snapshot().await.into())
}

/// POST /api/session/refresh
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn refresh_session(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
) -> Result<Json<SessionResponse>, ServerError> {
	let refreshed = state.sessions.refresh(user.user_id).await?;
	sync_sessions(&state.registry, &refreshed).await;

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::SessionRefreshed)
			.actor(user.user_id)
			.resource("auth_session", user.auth_session_id.to_string())
			.build(),
	);
	Ok(Json(refreshed.into()))
}

/// PATCH /api/profile
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn update_profile(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Json(update): Json<ProfileUpdate>,
) -> Result<Json<SessionResponse>, ServerError> {
	let updated = {
		let mut session = user.session.write().await;
		state.sessions.update_profile(&mut session, &update).await?;
		session.clone()
	};
	sync_sessions(&state.registry, &updated).await;
	Ok(Json(updated.into()))
}

#[derive(Debug, Deserialize)]
pub struct PermissionCheckRequest {
	pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PermissionCheckResponse {
	pub allowed: bool,
}

/// POST /api/permissions/check
///
/// True only if the session holds every listed permission. Unknown keys are
/// never held.
pub async fn check_permissions(
	RequireAuth(user): RequireAuth,
	Json(request): Json<PermissionCheckRequest>,
) -> Json<PermissionCheckResponse> {
	let session = user.session.read().await;
	Json(PermissionCheckResponse {
		allowed: session.has_permission_keys(request.permissions.as_slice()),
	})
}

#[derive(Debug, Serialize)]
pub struct FeatureAccessResponse {
	pub feature: String,
	#[serde(flatten)]
	pub decision: FeatureDecision,
}

/// GET /api/features/{key}
#[tracing::instrument(skip(user, state), fields(user_id = %user.user_id))]
pub async fn feature_access(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Path(key): Path<String>,
) -> Json<FeatureAccessResponse> {
	let tier = user.session.read().await.tier();
	let decision = state.feature_gate.decide(tier, &key).await;

	if !decision.allowed {
		state.audit.log(
			AuditLogEntry::builder(AuditEventType::FeatureDenied)
				.severity(AuditSeverity::Info)
				.actor(user.user_id)
				.resource("feature", key.clone())
				.details(json!({ "tier": tier, "decision": decision }))
				.build(),
		);
	}

	Json(FeatureAccessResponse {
		feature: key,
		decision,
	})
}
