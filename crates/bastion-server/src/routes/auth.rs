// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sign-in and sign-out.

use axum::{extract::State, http::StatusCode, Json};
use bastion_auth_core::AuthSessionId;
use bastion_server_audit::{AuditEventType, AuditLogEntry};
use bastion_server_db::AuthSessionRecord;
use bastion_server_session::UserSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::AppState;
use crate::auth_middleware::RequireAuth;
use crate::error::ServerError;
use crate::identity::{generate_session_token, hash_token};
use crate::routes::sync_sessions;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
	pub assertion: String,
}

#[derive(Debug, Serialize)]
pub struct SignInResponse {
	pub token: String,
	pub expires_at: DateTime<Utc>,
	pub session: UserSession,
}

/// POST /api/auth/sign-in
///
/// Exchanges an identity assertion for a Bastion session token and builds
/// the user's session. The profile is provisioned on first sign-in.
#[tracing::instrument(skip_all)]
pub async fn sign_in(
	State(state): State<AppState>,
	Json(request): Json<SignInRequest>,
) -> Result<(StatusCode, Json<SignInResponse>), ServerError> {
	let user_id = match state.identity.verify(request.assertion.trim()) {
		Ok(user_id) => user_id,
		Err(e) => {
			tracing::debug!(error = %e, "identity assertion rejected");
			state.audit.log(
				AuditLogEntry::builder(AuditEventType::SignInFailed)
					.details(json!({ "reason": e.to_string() }))
					.build(),
			);
			return Err(ServerError::Unauthorized(e.to_string()));
		}
	};

	let session = state.sessions.sign_in(user_id).await?;

	let token = generate_session_token();
	let now = Utc::now();
	let record = AuthSessionRecord {
		id: AuthSessionId::generate(),
		user_id,
		token_hash: hash_token(&token),
		created_at: now,
		last_used_at: now,
		expires_at: now + state.session_expiry,
	};
	state.auth_sessions.create_session(&record).await?;

	sync_sessions(&state.registry, &session).await;
	state.registry.insert(record.id, session.clone()).await;

	tracing::info!(user_id = %user_id, session_id = %record.id, role = %session.role(), "signed in");
	state.audit.log(
		AuditLogEntry::builder(AuditEventType::SignIn)
			.actor(user_id)
			.resource("auth_session", record.id.to_string())
			.build(),
	);

	Ok((
		StatusCode::CREATED,
		Json(SignInResponse {
			token,
			expires_at: record.expires_at,
			session,
		}),
	))
}

/// DELETE /api/auth/session
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn sign_out(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
) -> Result<StatusCode, ServerError> {
	state.auth_sessions.delete_session(&user.auth_session_id).await?;
	state.registry.remove(&user.auth_session_id).await;

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::SignOut)
			.actor(user.user_id)
			.resource("auth_session", user.auth_session_id.to_string())
			.build(),
	);
	Ok(StatusCode::NO_CONTENT)
}
