// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router.

use std::sync::Arc;

use axum::{
	middleware::from_fn_with_state,
	routing::{get, post},
	Router,
};
use bastion_server_audit::{
	AuditFilterConfig, AuditService, AuditSink, SqliteAuditSink, TracingAuditSink,
};
use bastion_server_completion::{ChatCompletionClient, CompletionError, CompletionProvider};
use bastion_server_config::ServerConfig;
use bastion_server_db::{
	AuthSessionRepository, AuthSessionStore, DocumentRepository, DocumentStore,
	FeatureRuleRepository, ProfileRepository, SqlitePool, TeamRepository, TicketRepository,
	TicketStore, UsageRepository,
};
use bastion_server_policy::DailyUsageLimiter;
use bastion_server_session::{FeatureGate, ReconcileService, SessionManager};

use crate::auth_middleware::auth_layer;
use crate::error::ServerError;
use crate::identity::IdentityVerifier;
use crate::routes;
use crate::session_registry::SessionRegistry;

#[derive(Clone)]
pub struct AppState {
	pub pool: SqlitePool,
	pub auth_sessions: Arc<dyn AuthSessionStore>,
	pub tickets: Arc<dyn TicketStore>,
	pub documents: Arc<dyn DocumentStore>,
	pub sessions: Arc<SessionManager>,
	pub reconciler: Arc<ReconcileService>,
	pub feature_gate: Arc<FeatureGate>,
	pub usage_limiter: Arc<DailyUsageLimiter>,
	pub audit: Arc<AuditService>,
	pub completion: Option<Arc<dyn CompletionProvider>>,
	pub identity: Arc<IdentityVerifier>,
	pub registry: SessionRegistry,
	pub session_expiry: chrono::Duration,
}

impl AppState {
	/// Deletes expired sign-ins and evicts their in-memory sessions.
	pub async fn purge_expired_sessions(&self) -> Result<usize, ServerError> {
		let removed = self.auth_sessions.delete_expired_sessions().await?;
		let evicted = self.registry.remove_all(&removed).await;
		tracing::debug!(removed = removed.len(), evicted, "purged expired sign-ins");
		Ok(removed.len())
	}

	/// Drains the reconciliation queue, then the audit queue.
	pub async fn shutdown(&self) {
		self.reconciler.shutdown().await;
		self.audit.shutdown().await;
	}
}

/// Wires repositories and services over a migrated pool.
///
/// Must be called from within a tokio runtime; the reconciliation and audit
/// workers are spawned here.
pub async fn create_app_state(
	pool: SqlitePool,
	config: &ServerConfig,
) -> Result<AppState, ServerError> {
	let filter = AuditFilterConfig::from_config(&config.audit)
		.map_err(|e| ServerError::Internal(e.to_string()))?;
	let sinks: Vec<Arc<dyn AuditSink>> = vec![
		Arc::new(TracingAuditSink::new(filter.clone())),
		Arc::new(SqliteAuditSink::new(pool.clone(), filter)),
	];
	let audit = Arc::new(
		AuditService::from_config(&config.audit, sinks)
			.map_err(|e| ServerError::Internal(e.to_string()))?,
	);

	let profiles = Arc::new(ProfileRepository::new(pool.clone()));
	let teams = Arc::new(TeamRepository::new(pool.clone()));
	let reconciler = Arc::new(ReconcileService::new(
		profiles.clone(),
		Arc::clone(&audit),
		&config.reconcile,
	));
	let sessions = Arc::new(SessionManager::new(
		profiles,
		teams,
		Arc::clone(&reconciler),
		Arc::clone(&audit),
	));

	let completion: Option<Arc<dyn CompletionProvider>> =
		match ChatCompletionClient::from_config(&config.completion) {
			Ok(client) => Some(Arc::new(client)),
			Err(CompletionError::NotConfigured) => {
				tracing::info!("no completion API key configured, suggestions are disabled");
				None
			}
			Err(e) => {
				tracing::warn!(error = %e, "completion client unavailable, suggestions are disabled");
				None
			}
		};

	Ok(AppState {
		auth_sessions: Arc::new(AuthSessionRepository::new(pool.clone())),
		tickets: Arc::new(TicketRepository::new(pool.clone())),
		documents: Arc::new(DocumentRepository::new(pool.clone())),
		sessions,
		reconciler,
		feature_gate: Arc::new(FeatureGate::new(Arc::new(FeatureRuleRepository::new(
			pool.clone(),
		)))),
		usage_limiter: Arc::new(DailyUsageLimiter::suggestions(
			Arc::new(UsageRepository::new(pool.clone())),
			config.usage.daily_suggestion_limit,
		)),
		audit,
		completion,
		identity: Arc::new(IdentityVerifier::new(config.auth.identity_secret.clone())),
		registry: SessionRegistry::new(),
		session_expiry: chrono::Duration::days(config.auth.session_expiry_days),
		pool,
	})
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/api/auth/sign-in", post(routes::auth::sign_in))
		.route("/api/auth/session", axum::routing::delete(routes::auth::sign_out))
		.route("/api/session", get(routes::session::get_session))
		.route("/api/session/refresh", post(routes::session::refresh_session))
		.route("/api/profile", axum::routing::patch(routes::session::update_profile))
		.route("/api/permissions/check", post(routes::session::check_permissions))
		.route("/api/features/{key}", get(routes::session::feature_access))
		.route("/api/teams/{team_id}/join", post(routes::teams::join_team))
		.route("/api/teams/{team_id}/leave", post(routes::teams::leave_team))
		.route(
			"/api/tickets",
			get(routes::tickets::list_tickets).post(routes::tickets::create_ticket),
		)
		.route(
			"/api/tickets/{id}",
			get(routes::tickets::get_ticket).patch(routes::tickets::update_ticket),
		)
		.route("/api/tickets/{id}/activity", get(routes::tickets::list_activity))
		.route(
			"/api/documents",
			get(routes::documents::list_documents).post(routes::documents::create_document),
		)
		.route(
			"/api/documents/{id}",
			get(routes::documents::get_document)
				.patch(routes::documents::update_document)
				.delete(routes::documents::delete_document),
		)
		.route("/api/suggestions", post(routes::suggestions::create_suggestion))
		.layer(from_fn_with_state(state.clone(), auth_layer))
		.with_state(state)
}
