// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ticket HTTP handlers.
//!
//! Reading needs `tickets:read`, creating and editing `tickets:write`.
//! Assigning a ticket to someone other than yourself also needs
//! `tickets:assign`.
//!
//! A user only ever sees tickets they created, are assigned, or that belong
//! to their current team. Any other ticket answers 404.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	Json,
};
use bastion_auth_core::{
	Permission, TeamId, Ticket, TicketActivity, TicketDraft, TicketId, TicketPatch, TicketStatus,
	UserId,
};
use bastion_server_audit::{AuditEventType, AuditLogEntry};
use bastion_server_db::{TicketFilter, TicketScope};
use bastion_server_session::UserSession;
use serde::Deserialize;
use serde_json::json;

use crate::api::AppState;
use crate::auth_middleware::RequireAuth;
use crate::error::ServerError;
use crate::routes::authorize;

const RESOURCE: &str = "ticket";

fn parse_ticket_id(raw: &str) -> Result<TicketId, ServerError> {
	raw.parse()
		.map_err(|_| ServerError::BadRequest(format!("'{raw}' is not a valid ticket id")))
}

fn check_assignee(
	state: &AppState,
	session: &UserSession,
	assignee: Option<UserId>,
	ticket_id: Option<TicketId>,
) -> Result<(), ServerError> {
	match assignee {
		Some(assignee) if assignee != session.user_id => authorize(
			&state.audit,
			session,
			Permission::TicketsAssign,
			RESOURCE,
			ticket_id.map(|id| id.to_string()),
		),
		_ => Ok(()),
	}
}

async fn load_ticket(
	state: &AppState,
	id: &TicketId,
	session: &UserSession,
) -> Result<Ticket, ServerError> {
	state
		.tickets
		.get_ticket(id)
		.await?
		.filter(|t| t.accessible_to(session.user_id, session.team_id))
		.ok_or_else(|| ServerError::NotFound(format!("Ticket {id}")))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListTicketsQuery {
	pub status: Option<TicketStatus>,
	pub assignee_id: Option<UserId>,
	pub team_id: Option<TeamId>,
	pub limit: Option<i64>,
}

/// GET /api/tickets
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn list_tickets(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Query(query): Query<ListTicketsQuery>,
) -> Result<Json<Vec<Ticket>>, ServerError> {
	let session = user.snapshot().await;
	authorize(&state.audit, &session, Permission::TicketsRead, RESOURCE, None)?;

	let filter = TicketFilter {
		scope: Some(TicketScope {
			user_id: session.user_id,
			team_id: session.team_id,
		}),
		team_id: query.team_id,
		status: query.status,
		assignee_id: query.assignee_id,
		limit: query.limit,
	};
	Ok(Json(state.tickets.list_tickets(&filter).await?))
}

/// POST /api/tickets
///
/// The ticket belongs to the creator's current team, if any.
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_ticket(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Json(draft): Json<TicketDraft>,
) -> Result<(StatusCode, Json<Ticket>), ServerError> {
	let session = user.snapshot().await;
	authorize(&state.audit, &session, Permission::TicketsWrite, RESOURCE, None)?;
	draft.validate()?;
	check_assignee(&state, &session, draft.assignee_id, None)?;

	let (ticket, activity) = draft.into_ticket(session.user_id, session.team_id);
	state.tickets.create_ticket(&ticket, &activity).await?;

	tracing::debug!(ticket_id = %ticket.id, "ticket created");
	state.audit.log(
		AuditLogEntry::builder(AuditEventType::TicketCreated)
			.actor(session.user_id)
			.resource(RESOURCE, ticket.id.to_string())
			.details(json!({ "priority": ticket.priority }))
			.build(),
	);
	Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET /api/tickets/{id}
#[tracing::instrument(skip(user, state), fields(user_id = %user.user_id))]
pub async fn get_ticket(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Ticket>, ServerError> {
	let id = parse_ticket_id(&id)?;
	let session = user.snapshot().await;
	authorize(&state.audit, &session, Permission::TicketsRead, RESOURCE, Some(id.to_string()))?;
	Ok(Json(load_ticket(&state, &id, &session).await?))
}

/// PATCH /api/tickets/{id}
///
/// The ticket row and its activity entries are written in one transaction.
/// Returns 409 if the ticket changed after it was read.
#[tracing::instrument(skip(user, state, patch), fields(user_id = %user.user_id))]
pub async fn update_ticket(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(patch): Json<TicketPatch>,
) -> Result<Json<Ticket>, ServerError> {
	let id = parse_ticket_id(&id)?;
	let session = user.snapshot().await;
	authorize(&state.audit, &session, Permission::TicketsWrite, RESOURCE, Some(id.to_string()))?;
	patch.validate()?;

	let ticket = load_ticket(&state, &id, &session).await?;
	if patch.changes_assignee(&ticket) {
		check_assignee(&state, &session, patch.assignee_id.flatten(), Some(id))?;
	}

	let (next, activities) = patch.apply(&ticket, session.user_id);
	if activities.is_empty() {
		return Ok(Json(ticket));
	}
	state
		.tickets
		.update_ticket(&next, ticket.updated_at, &activities)
		.await?;

	let actions: Vec<_> = activities.iter().map(|a| a.action).collect();
	tracing::debug!(ticket_id = %id, ?actions, "ticket updated");
	state.audit.log(
		AuditLogEntry::builder(AuditEventType::TicketUpdated)
			.actor(session.user_id)
			.resource(RESOURCE, id.to_string())
			.details(json!({ "actions": actions }))
			.build(),
	);
	Ok(Json(next))
}

/// GET /api/tickets/{id}/activity
#[tracing::instrument(skip(user, state), fields(user_id = %user.user_id))]
pub async fn list_activity(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Vec<TicketActivity>>, ServerError> {
	let id = parse_ticket_id(&id)?;
	let session = user.snapshot().await;
	authorize(&state.audit, &session, Permission::TicketsRead, RESOURCE, Some(id.to_string()))?;

	load_ticket(&state, &id, &session).await?;
	Ok(Json(state.tickets.list_activity(&id).await?))
}
