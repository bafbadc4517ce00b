// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// A stored or submitted string did not name a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseEnumError {
	pub kind: &'static str,
	pub value: String,
}

impl ParseEnumError {
	pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
		Self {
			kind,
			value: value.into(),
		}
	}
}

/// Client-supplied data failed a field check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
	pub field: &'static str,
	pub reason: &'static str,
}

impl ValidationError {
	pub fn new(field: &'static str, reason: &'static str) -> Self {
		Self { field, reason }
	}
}

pub(crate) fn check_text(
	field: &'static str,
	value: &str,
	max_chars: usize,
	required: bool,
) -> Result<(), ValidationError> {
	if required && value.trim().is_empty() {
		return Err(ValidationError::new(field, "must not be empty"));
	}
	if value.chars().count() > max_chars {
		return Err(ValidationError::new(field, "is too long"));
	}
	Ok(())
}
