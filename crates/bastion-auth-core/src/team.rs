// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Teams and memberships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseEnumError;
use crate::types::{TeamId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
	pub id: TeamId,
	pub name: String,
	pub description: Option<String>,
	pub created_at: DateTime<Utc>,
}

impl Team {
	pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
		Self {
			id: TeamId::generate(),
			name: name.into(),
			description,
			created_at: Utc::now(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
	Lead,
	Member,
}

impl TeamRole {
	pub fn as_str(&self) -> &'static str {
		match self {
			TeamRole::Lead => "lead",
			TeamRole::Member => "member",
		}
	}
}

impl fmt::Display for TeamRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for TeamRole {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"lead" => Ok(TeamRole::Lead),
			"member" => Ok(TeamRole::Member),
			_ => Err(ParseEnumError::new("team role", s)),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMembership {
	pub team_id: TeamId,
	pub user_id: UserId,
	pub role: TeamRole,
	pub created_at: DateTime<Utc>,
}

impl TeamMembership {
	pub fn new(team_id: TeamId, user_id: UserId, role: TeamRole) -> Self {
		Self {
			team_id,
			user_id,
			role,
			created_at: Utc::now(),
		}
	}
}
