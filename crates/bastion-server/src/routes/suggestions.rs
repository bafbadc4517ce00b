// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! AI writing suggestions, streamed as server-sent events.
//!
//! Order of checks: permission, daily usage limit, content policy. The
//! limit is consumed before the prompt is scanned, so rejected prompts
//! still count against the day's allowance.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
	extract::State,
	response::sse::{Event, KeepAlive, Sse},
	Json,
};
use bastion_auth_core::{Permission, UserId};
use bastion_server_audit::{AuditEventType, AuditLogEntry, AuditService};
use bastion_server_completion::{Completion, CompletionError, CompletionEvent, EventStream};
use bastion_server_policy::{check_content, PolicyError};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;

use crate::api::AppState;
use crate::auth_middleware::RequireAuth;
use crate::error::ServerError;
use crate::routes::authorize;

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
	pub prompt: String,
}

/// Payloads of the `delta`, `completed` and `error` events.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuggestionStreamEvent {
	Delta { content: String },
	Completed { completion: Completion },
	Error { message: String },
}

impl SuggestionStreamEvent {
	fn name(&self) -> &'static str {
		match self {
			SuggestionStreamEvent::Delta { .. } => "delta",
			SuggestionStreamEvent::Completed { .. } => "completed",
			SuggestionStreamEvent::Error { .. } => "error",
		}
	}
}

/// POST /api/suggestions
#[tracing::instrument(skip_all, fields(user_id = %user.user_id))]
pub async fn create_suggestion(
	RequireAuth(user): RequireAuth,
	State(state): State<AppState>,
	Json(request): Json<SuggestionRequest>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, ServerError> {
	if request.prompt.trim().is_empty() {
		return Err(ServerError::BadRequest("Prompt must not be empty.".to_string()));
	}

	let session = user.snapshot().await;
	authorize(&state.audit, &session, Permission::AiSuggest, "suggestion", None)?;

	let grant = match state.usage_limiter.consume(&session.user_id).await {
		Ok(grant) => grant,
		Err(PolicyError::LimitReached { counter, limit }) => {
			state.audit.log(
				AuditLogEntry::builder(AuditEventType::RateLimited)
					.actor(session.user_id)
					.details(json!({ "counter": counter, "limit": limit }))
					.build(),
			);
			return Err(PolicyError::LimitReached { counter, limit }.into());
		}
		Err(e) => return Err(e.into()),
	};

	if let Err(e) = check_content(&request.prompt) {
		if let PolicyError::SensitiveContent { rules } = &e {
			tracing::info!(?rules, "prompt rejected by content policy");
			state.audit.log(
				AuditLogEntry::builder(AuditEventType::ContentPolicyViolation)
					.actor(session.user_id)
					.details(json!({ "rules": rules }))
					.build(),
			);
		}
		return Err(e.into());
	}

	let provider = state
		.completion
		.clone()
		.ok_or(CompletionError::NotConfigured)?;

	state.audit.log(
		AuditLogEntry::builder(AuditEventType::SuggestionRequested)
			.actor(session.user_id)
			.details(json!({
				"prompt_chars": request.prompt.chars().count(),
				"remaining_today": grant.remaining,
			}))
			.build(),
	);

	let stream = match provider.stream_suggestion(&request.prompt).await {
		Ok(stream) => stream,
		Err(e) => {
			audit_failure(&state.audit, session.user_id, &e);
			return Err(e.into());
		}
	};

	Ok(create_sse_response(stream, Arc::clone(&state.audit), session.user_id))
}

fn audit_failure(audit: &AuditService, user_id: UserId, error: &CompletionError) {
	audit.log(
		AuditLogEntry::builder(AuditEventType::SuggestionFailed)
			.actor(user_id)
			.details(json!({ "error": error.to_string() }))
			.build(),
	);
}

fn create_sse_response(
	stream: EventStream,
	audit: Arc<AuditService>,
	user_id: UserId,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
	let (tx, rx) = tokio::sync::mpsc::channel::<Result<Event, Infallible>>(32);

	tokio::spawn(async move {
		let mut stream = stream;
		while let Some(event) = stream.next().await {
			let stream_event = match event {
				CompletionEvent::Delta { content } => SuggestionStreamEvent::Delta { content },
				CompletionEvent::Completed(completion) => {
					tracing::info!(
						finish_reason = ?completion.finish_reason,
						chars = completion.content.len(),
						"suggestion completed"
					);
					SuggestionStreamEvent::Completed { completion }
				}
				CompletionEvent::Error(err) => {
					tracing::warn!(error = %err, "suggestion stream error");
					audit_failure(&audit, user_id, &err);
					SuggestionStreamEvent::Error {
						message: err.public_message().to_string(),
					}
				}
			};

			let sse_event = match serde_json::to_string(&stream_event) {
				Ok(json) => Event::default().event(stream_event.name()).data(json),
				Err(e) => {
					tracing::error!(error = %e, "failed to serialize suggestion event");
					continue;
				}
			};

			let terminal = !matches!(stream_event, SuggestionStreamEvent::Delta { .. });
			if tx.send(Ok(sse_event)).await.is_err() {
				tracing::debug!("client disconnected from suggestion stream");
				break;
			}
			if terminal {
				break;
			}
		}
	});

	Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default())
}
