// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use bastion_common_http::RetryableError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
	#[error("completion API is not configured")]
	NotConfigured,

	#[error("HTTP error: {0}")]
	Http(String),

	#[error("request timed out")]
	Timeout,

	#[error("rate limited by completion API")]
	RateLimited { retry_after_secs: Option<u64> },

	#[error("completion API error ({status}): {message}")]
	Api { status: u16, message: String },

	#[error("invalid response: {0}")]
	InvalidResponse(String),
}

impl CompletionError {
	/// Message safe to show an end user.
	pub fn public_message(&self) -> &'static str {
		match self {
			CompletionError::NotConfigured => "AI suggestions are not available on this server.",
			CompletionError::RateLimited { .. } => {
				"The AI service is busy. Please try again in a moment."
			}
			CompletionError::Timeout => "The AI service took too long to respond.",
			_ => "The AI service could not complete the request.",
		}
	}
}

impl RetryableError for CompletionError {
	fn is_retryable(&self) -> bool {
		match self {
			CompletionError::Http(_) | CompletionError::Timeout | CompletionError::RateLimited { .. } => {
				true
			}
			CompletionError::Api { status, .. } => *status >= 500,
			CompletionError::NotConfigured | CompletionError::InvalidResponse(_) => false,
		}
	}
}

pub type Result<T> = std::result::Result<T, CompletionError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transport_failures_are_retryable() {
		assert!(CompletionError::Http("reset".into()).is_retryable());
		assert!(CompletionError::Timeout.is_retryable());
		assert!(CompletionError::RateLimited { retry_after_secs: Some(2) }.is_retryable());
		assert!(CompletionError::Api { status: 503, message: "overloaded".into() }.is_retryable());
	}

	#[test]
	fn client_errors_are_final() {
		assert!(!CompletionError::Api { status: 400, message: "bad".into() }.is_retryable());
		assert!(!CompletionError::NotConfigured.is_retryable());
		assert!(!CompletionError::InvalidResponse("junk".into()).is_retryable());
	}

	#[test]
	fn public_message_hides_details() {
		let err = CompletionError::Api {
			status: 401,
			message: "Incorrect API key provided: sk-abc".into(),
		};
		assert!(!err.public_message().contains("sk-"));
	}
}
