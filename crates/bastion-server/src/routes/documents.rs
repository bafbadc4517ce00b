// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Document HTTP handlers.
//!
//! A document is shared with its owner and the members of its team. Within
//! the team, restricted documents are only visible to their owner and to
//! holders of `documents:classify`. To everyone else they do not exist, so
//! lookups return 404 rather than 403.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	Json,
};
use bastion_auth_core::{Document, DocumentDraft, DocumentId, DocumentPatch, Permission};
use bastion_server_session::UserSession;
use bastion_server_audit::{AuditEventType, AuditLogEntry};
use serde_json::json;

use crate::api::AppState;
use crate::auth_middleware::RequireAuth;
use crate::error::ServerError;
use crate::routes::authorize;

const RESOURCE: &str = "document";

fn parse_document_id(raw: &str) -> Result<DocumentId, ServerError> {
	raw.parse()
		.map_err(|_| ServerError::BadRequest(format!("'{raw}' is not a valid document id")))
}

async fn load_visible(
	state: &AppState,
	id: &DocumentId,
	session: &UserSession,
) -> Result<Document, ServerError> {
	let can_classify = session.has_permission(Permission::DocumentsClassify);
	state
		.documents
		.get_document(id)
		.await?
		.filter(|d| d.visible_to(session.user_id, session.team_id, can_classify))
		.ok_or_else(|| ServerError::NotFound(format!("Document {id}")))
}

/// GET /api/documents
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn list_documents(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
) -> Result<Json<Vec<Document>>, ServerError> {
	let session = user.snapshot().await;
	authorize(&state.audit, &session, Permission::DocumentsRead, RESOURCE, None)?;

	let can_classify = session.has_permission(Permission::DocumentsClassify);
	let documents = state
		.documents
		.list_visible_documents(&session.user_id, session.team_id.as_ref(), can_classify)
		.await?;
	Ok(Json(documents))
}

/// POST /api/documents
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_document(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Json(draft): Json<DocumentDraft>,
) -> Result<(StatusCode, Json<Document>), ServerError> {
	let session = user.snapshot().await;
	authorize(&state.audit, &session, Permission::DocumentsWrite, RESOURCE, None)?;
	draft.validate()?;

	let document = draft.into_document(session.user_id, session.team_id);
	state.documents.create_document(&document).await?;

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::DocumentCreated)
			.actor(session.user_id)
			.resource(RESOURCE, document.id.to_string())
			.details(json!({ "sensitivity": document.sensitivity }))
			.build(),
	);
	Ok((StatusCode::CREATED, Json(document)))
}

/// GET /api/documents/{id}
#[tracing::instrument(skip(user, state), fields(user_id = %user.user_id))]
pub async fn get_document(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Document>, ServerError> {
	let id = parse_document_id(&id)?;
	let session = user.snapshot().await;
	authorize(&state.audit, &session, Permission::DocumentsRead, RESOURCE, Some(id.to_string()))?;

	Ok(Json(load_visible(&state, &id, &session).await?))
}

/// PATCH /api/documents/{id}
///
/// Editing title or body is reserved to the owner. Changing sensitivity
/// needs `documents:classify` and may be done by any teammate holding it.
#[tracing::instrument(skip(user, state, patch), fields(user_id = %user.user_id))]
pub async fn update_document(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(patch): Json<DocumentPatch>,
) -> Result<Json<Document>, ServerError> {
	let id = parse_document_id(&id)?;
	let session = user.snapshot().await;
	patch.validate()?;

	let document = load_visible(&state, &id, &session).await?;

	let reclassify = patch.changes_sensitivity(&document);
	if patch.changes_content() {
		authorize(&state.audit, &session, Permission::DocumentsWrite, RESOURCE, Some(id.to_string()))?;
		if document.owner_id != session.user_id {
			return Err(ServerError::Forbidden(
				"Only the owner can edit this document.".to_string(),
			));
		}
	}
	if reclassify {
		authorize(
			&state.audit,
			&session,
			Permission::DocumentsClassify,
			RESOURCE,
			Some(id.to_string()),
		)?;
	}
	if !patch.changes_content() && !reclassify {
		return Ok(Json(document));
	}

	let next = patch.apply(&document);
	state.documents.update_document(&next).await?;

	if patch.changes_content() {
		state.audit.log(
			AuditLogEntry::builder(AuditEventType::DocumentUpdated)
				.actor(session.user_id)
				.resource(RESOURCE, id.to_string())
				.build(),
		);
	}
	if reclassify {
		tracing::info!(
			document_id = %id,
			from = %document.sensitivity,
			to = %next.sensitivity,
			"document reclassified"
		);
		state.audit.log(
			AuditLogEntry::builder(AuditEventType::DocumentReclassified)
				.actor(session.user_id)
				.resource(RESOURCE, id.to_string())
				.details(json!({ "from": document.sensitivity, "to": next.sensitivity }))
				.build(),
		);
	}
	Ok(Json(next))
}

/// DELETE /api/documents/{id}
///
/// Allowed for the owner and for teammates holding `documents:classify`.
#[tracing::instrument(skip(user, state), fields(user_id = %user.user_id))]
pub async fn delete_document(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
	let id = parse_document_id(&id)?;
	let session = user.snapshot().await;

	let document = load_visible(&state, &id, &session).await?;
	if document.owner_id != session.user_id {
		authorize(
			&state.audit,
			&session,
			Permission::DocumentsClassify,
			RESOURCE,
			Some(id.to_string()),
		)?;
	}

	if !state.documents.delete_document(&id).await? {
		return Err(ServerError::NotFound(format!("Document {id}")));
	}

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::DocumentDeleted)
			.actor(session.user_id)
			.resource(RESOURCE, id.to_string())
			.details(json!({ "sensitivity": document.sensitivity }))
			.build(),
	);
	Ok(StatusCode::NO_CONTENT)
}
