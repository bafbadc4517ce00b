// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Team membership HTTP handlers.

use axum::{
	extract::{Path, State},
	Json,
};
use bastion_auth_core::TeamId;

use crate::api::AppState;
use crate::auth_middleware::RequireAuth;
use crate::error::ServerError;
use crate::routes::session::SessionResponse;
use crate::routes::sync_sessions;

fn parse_team_id(raw: &str) -> Result<TeamId, ServerError> {
	raw.parse()
		.map_err(|_| ServerError::BadRequest(format!("'{raw}' is not a valid team id")))
}

/// POST /api/teams/{team_id}/join
#[tracing::instrument(skip(user, state), fields(user_id = %user.user_id))]
pub async fn join_team(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Path(team_id): Path<String>,
) -> Result<Json<SessionResponse>, ServerError> {
	let team_id = parse_team_id(&team_id)?;
	let updated = {
		let mut session = user.session.write().await;
		state.sessions.join_team(&mut session, team_id).await?;
		session.clone()
	};
	sync_sessions(&state.registry, &updated).await;
	Ok(Json(updated.into()))
}

/// POST /api/teams/{team_id}/leave
#[tracing::instrument(skip(user, state), fields(user_id = %user.user_id))]
pub async fn leave_team(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Path(team_id): Path<String>,
) -> Result<Json<SessionResponse>, ServerError> {
	let team_id = parse_team_id(&team_id)?;
	let updated = {
		let mut session = user.session.write().await;
		state.sessions.leave_team(&mut session, team_id).await?;
		session.clone()
	};
	sync_sessions(&state.registry, &updated).await;
	Ok(Json(updated.into()))
}
