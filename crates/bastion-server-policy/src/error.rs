// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use bastion_server_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
	#[error("daily limit of {limit} reached for '{counter}'")]
	LimitReached { counter: String, limit: u32 },

	#[error("content matched sensitive-data rules: {}", rules.join(", "))]
	SensitiveContent { rules: Vec<&'static str> },

	#[error("usage store error: {0}")]
	Store(#[from] DbError),
}

pub type Result<T> = std::result::Result<T, PolicyError>;
