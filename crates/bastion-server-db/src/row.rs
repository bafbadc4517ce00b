// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Column decoding shared by the repositories. Ids and timestamps are stored
//! as text (UUID and RFC 3339).

use chrono::{DateTime, Utc};
use std::fmt::Display;
use std::str::FromStr;

use crate::error::DbError;

pub(crate) fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

pub(crate) fn parse_column<T>(value: &str, column: &str) -> Result<T, DbError>
where
	T: FromStr,
	T::Err: Display,
{
	value
		.parse()
		.map_err(|e| DbError::Internal(format!("Invalid {column} '{value}': {e}")))
}

pub(crate) fn parse_optional<T>(value: Option<String>, column: &str) -> Result<Option<T>, DbError>
where
	T: FromStr,
	T::Err: Display,
{
	value.map(|v| parse_column(&v, column)).transpose()
}

/// Empty strings clear a nullable text column.
pub(crate) fn nullable_text(value: &str) -> Option<&str> {
	let trimmed = value.trim();
	if trimmed.is_empty() {
		None
	} else {
		Some(trimmed)
	}
}
