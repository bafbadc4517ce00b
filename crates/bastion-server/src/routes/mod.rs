// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP route handlers.

pub mod auth;
pub mod documents;
pub mod health;
pub mod session;
pub mod suggestions;
pub mod teams;
pub mod tickets;

use bastion_auth_core::Permission;
use bastion_server_audit::{AuditEventType, AuditLogEntry, AuditService};
use bastion_server_session::UserSession;
use serde_json::json;

use crate::error::ServerError;
use crate::session_registry::SessionRegistry;

/// Fails with 403 unless the session holds `permission`. Denials are audited.
pub(crate) fn authorize(
	audit: &AuditService,
	session: &UserSession,
	permission: Permission,
	resource_type: &str,
	resource_id: Option<String>,
) -> Result<(), ServerError> {
	if session.has_permission(permission) {
		return Ok(());
	}

	tracing::debug!(
		user_id = %session.user_id,
		role = %session.role(),
		permission = permission.key(),
		"permission denied"
	);
	let mut entry = AuditLogEntry::builder(AuditEventType::AccessDenied)
		.actor(session.user_id)
		.details(json!({
			"permission": permission.key(),
			"role": session.role(),
		}));
	if let Some(id) = resource_id {
		entry = entry.resource(resource_type, id);
	}
	audit.log(entry.build());

	Err(ServerError::Forbidden(format!(
		"Your role does not allow this action ({}).",
		permission.key()
	)))
}

/// Copies `updated` into every other sign-in of the same user.
pub(crate) async fn sync_sessions(registry: &SessionRegistry, updated: &UserSession) {
	for shared in registry.for_user(&updated.user_id).await {
		let mut session = shared.write().await;
		if *session != *updated {
			*session = updated.clone();
		}
	}
}
