// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication middleware for Axum.
//!
//! [`auth_layer`] resolves the bearer token of every request to a sign-in
//! and its [`UserSession`], and stores an [`AuthContext`] as a request
//! extension. Handlers then use [`RequireAuth`].
//!
//! Tokens are hashed with SHA-256 before lookup and never logged. Each
//! authenticated request slides the sign-in's expiry forward.

use axum::{
	body::Body,
	extract::{FromRequestParts, State},
	http::{header::AUTHORIZATION, request::Parts, HeaderMap, Request},
	middleware::Next,
	response::{IntoResponse, Response},
};
use bastion_auth_core::{AuthSessionId, UserId};
use bastion_server_session::UserSession;
use chrono::Utc;
use tracing::instrument;

use crate::api::AppState;
use crate::error::ServerError;
use crate::identity::hash_token;
use crate::session_registry::SharedSession;

#[derive(Clone)]
pub struct CurrentUser {
	pub auth_session_id: AuthSessionId,
	pub user_id: UserId,
	pub session: SharedSession,
}

impl CurrentUser {
	/// A copy of the session as it is right now.
	pub async fn snapshot(&self) -> UserSession {
		self.session.read().await.clone()
	}
}

#[derive(Clone, Default)]
pub struct AuthContext {
	pub current_user: Option<CurrentUser>,
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
	let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
	let (scheme, token) = value.split_once(' ')?;
	let token = token.trim();
	if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
		Some(token.to_string())
	} else {
		None
	}
}

#[instrument(
	name = "auth_layer",
	skip(state, request, next),
	fields(user_id = tracing::field::Empty)
)]
pub async fn auth_layer(
	State(state): State<AppState>,
	mut request: Request<Body>,
	next: Next,
) -> Response {
	let mut context = AuthContext::default();

	if let Some(token) = extract_bearer_token(request.headers()) {
		if let Some(user) = authenticate(&state, &token).await {
			tracing::Span::current().record("user_id", tracing::field::display(&user.user_id));
			context.current_user = Some(user);
		}
	}

	request.extensions_mut().insert(context);
	next.run(request).await
}

#[instrument(skip_all, fields(session_id = tracing::field::Empty))]
async fn authenticate(state: &AppState, token: &str) -> Option<CurrentUser> {
	let token_hash = hash_token(token);

	let record = match state.auth_sessions.get_session_by_token_hash(&token_hash).await {
		Ok(Some(record)) => record,
		Ok(None) => {
			tracing::debug!("session not found for token hash");
			return None;
		}
		Err(e) => {
			tracing::error!(error = %e, "failed to look up session");
			return None;
		}
	};

	tracing::Span::current().record("session_id", tracing::field::display(&record.id));

	let now = Utc::now();
	if record.is_expired(now) {
		tracing::debug!(session_id = %record.id, "session expired");
		state.registry.remove(&record.id).await;
		return None;
	}

	let auth_sessions = state.auth_sessions.clone();
	let session_id = record.id;
	let expires_at = now + state.session_expiry;
	tokio::spawn(async move {
		if let Err(e) = auth_sessions.touch_session(&session_id, expires_at).await {
			tracing::warn!(error = %e, "failed to extend session");
		}
	});

	let session = match state.registry.get(&record.id).await {
		Some(session) => session,
		None => match state.sessions.refresh(record.user_id).await {
			Ok(user_session) => {
				tracing::debug!(session_id = %record.id, "rebuilt user session");
				state.registry.insert(record.id, user_session).await
			}
			Err(e) => {
				tracing::warn!(error = %e, user_id = %record.user_id, "could not rebuild user session");
				return None;
			}
		},
	};

	Some(CurrentUser {
		auth_session_id: record.id,
		user_id: record.user_id,
		session,
	})
}

/// Extractor that rejects the request with 401 unless it is authenticated.
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
	S: Send + Sync,
{
	type Rejection = Response;

	#[instrument(name = "RequireAuth::from_request_parts", skip_all)]
	async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
		let current_user = parts
			.extensions
			.get::<AuthContext>()
			.and_then(|ctx| ctx.current_user.clone());

		match current_user {
			Some(user) => Ok(RequireAuth(user)),
			None => {
				tracing::debug!("authentication required: no valid credentials");
				Err(ServerError::Unauthorized("authentication required".to_string()).into_response())
			}
		}
	}
}
