// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Request policies applied before an AI suggestion is generated: a per-user
//! daily usage limit and a sensitive-content check.

pub mod content;
pub mod error;
pub mod usage;

pub use content::{
	check_content, contains_sensitive, luhn_valid, matched_rules, redact, redact_in_place, scan,
	Detection,
};
pub use error::{PolicyError, Result};
pub use usage::{DailyUsageLimiter, UsageGrant, SUGGESTIONS_COUNTER};
