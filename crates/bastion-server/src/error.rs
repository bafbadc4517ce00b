// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.
//!
//! Every error body is an [`ErrorResponse`]: a machine-readable code plus the
//! title and message the UI shows as a toast.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use bastion_auth_core::{Notice, ValidationError};
use bastion_server_completion::CompletionError;
use bastion_server_db::DbError;
use bastion_server_policy::PolicyError;
use bastion_server_session::SessionError;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	#[error("Forbidden: {0}")]
	Forbidden(String),

	#[error("Content policy violation: {}", rules.join(", "))]
	ContentPolicy { rules: Vec<&'static str> },

	#[error("Daily limit of {limit} reached")]
	RateLimited { limit: u32 },

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Invalid request: {0}")]
	BadRequest(String),

	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error(transparent)]
	Session(#[from] SessionError),

	#[error("Database error: {0}")]
	Db(#[from] DbError),

	#[error("Completion error: {0}")]
	Completion(#[from] CompletionError),

	#[error("Internal error: {0}")]
	Internal(String),
}

impl From<PolicyError> for ServerError {
	fn from(err: PolicyError) -> Self {
		match err {
			PolicyError::LimitReached { limit, .. } => ServerError::RateLimited { limit },
			PolicyError::SensitiveContent { rules } => ServerError::ContentPolicy { rules },
			PolicyError::Store(e) => ServerError::Db(e),
		}
	}
}

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub title: String,
	pub message: String,
}

impl ErrorResponse {
	pub fn new(error: impl Into<String>, notice: Notice) -> Self {
		Self {
			error: error.into(),
			title: notice.title,
			message: notice.description,
		}
	}
}

fn internal() -> (StatusCode, &'static str, Notice) {
	(
		StatusCode::INTERNAL_SERVER_ERROR,
		"internal_error",
		Notice::new(
			"Something went wrong",
			"We could not complete the request. Please try again.",
		),
	)
}

impl ServerError {
	fn parts(&self) -> (StatusCode, &'static str, Notice) {
		match self {
			ServerError::Unauthorized(_) => (
				StatusCode::UNAUTHORIZED,
				"unauthorized",
				Notice::new("Sign-in required", "Please sign in to continue."),
			),
			ServerError::Forbidden(msg) => (
				StatusCode::FORBIDDEN,
				"forbidden",
				Notice::new("Access denied", msg.clone()),
			),
			ServerError::ContentPolicy { rules } => (
				StatusCode::FORBIDDEN,
				"content_policy",
				Notice::new(
					"Sensitive content detected",
					format!(
						"Remove sensitive data before requesting a suggestion ({}).",
						rules.join(", ")
					),
				),
			),
			ServerError::RateLimited { limit } => (
				StatusCode::TOO_MANY_REQUESTS,
				"rate_limited",
				Notice::new(
					"Daily limit reached",
					format!("You have used all {limit} suggestions for today."),
				),
			),
			ServerError::NotFound(what) => (
				StatusCode::NOT_FOUND,
				"not_found",
				Notice::new("Not found", format!("{what} was not found.")),
			),
			ServerError::BadRequest(msg) => (
				StatusCode::BAD_REQUEST,
				"bad_request",
				Notice::new("Invalid request", msg.clone()),
			),
			ServerError::Validation(e) => (
				StatusCode::BAD_REQUEST,
				"validation_error",
				Notice::new("Invalid input", e.to_string()),
			),
			ServerError::Conflict(msg) => (
				StatusCode::CONFLICT,
				"conflict",
				Notice::new("Conflict", msg.clone()),
			),
			ServerError::Session(e) => {
				let status = match e {
					SessionError::ProfileMissing(_) | SessionError::TeamNotFound(_) => {
						StatusCode::NOT_FOUND
					}
					SessionError::AlreadyMember(_) => StatusCode::CONFLICT,
					SessionError::NotMember(_) | SessionError::Validation(_) => StatusCode::BAD_REQUEST,
					SessionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
				};
				let code = match e {
					SessionError::ProfileMissing(_) | SessionError::TeamNotFound(_) => "not_found",
					SessionError::AlreadyMember(_) => "conflict",
					SessionError::NotMember(_) => "not_a_member",
					SessionError::Validation(_) => "validation_error",
					SessionError::Store(_) => "internal_error",
				};
				(status, code, e.notice())
			}
			ServerError::Db(DbError::NotFound(what)) => (
				StatusCode::NOT_FOUND,
				"not_found",
				Notice::new("Not found", format!("{what} was not found.")),
			),
			ServerError::Db(DbError::Conflict(_)) => (
				StatusCode::CONFLICT,
				"conflict",
				Notice::new(
					"Changed elsewhere",
					"Someone else changed this item. Reload and try again.",
				),
			),
			ServerError::Db(_) | ServerError::Internal(_) => internal(),
			ServerError::Completion(e) => {
				let (status, code) = match e {
					CompletionError::NotConfigured => {
						(StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
					}
					CompletionError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "upstream_timeout"),
					_ => (StatusCode::BAD_GATEWAY, "upstream_error"),
				};
				(
					status,
					code,
					Notice::new("Suggestion unavailable", e.public_message()),
				)
			}
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, code, notice) = self.parts();
		if status.is_server_error() {
			tracing::error!(error = %self, status = status.as_u16(), "request failed");
		} else {
			tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
		}
		(status, Json(ErrorResponse::new(code, notice))).into_response()
	}
}
