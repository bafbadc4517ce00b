// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Roles.
//!
//! A role is either one of the four *basic* roles or one of the twelve
//! *detailed* roles; every detailed role rolls up to a basic one. Profiles
//! created before the current model carry a [`LegacyRole`], which is
//! translated once and written back.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasicRole {
	Individual,
	TeamMember,
	TeamManager,
	Administrator,
}

impl BasicRole {
	pub fn as_str(&self) -> &'static str {
		match self {
			BasicRole::Individual => "individual",
			BasicRole::TeamMember => "team_member",
			BasicRole::TeamManager => "team_manager",
			BasicRole::Administrator => "administrator",
		}
	}
}

impl fmt::Display for BasicRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	// Basic
	Individual,
	TeamMember,
	TeamManager,
	Administrator,
	// Detailed
	IndividualBasic,
	IndividualProfessional,
	TeamAnalyst,
	TeamHunter,
	TeamResearcher,
	TeamRed,
	TeamBlue,
	TeamLead,
	SecurityManager,
	CisoDirector,
	PlatformAdmin,
	KnowledgeAdmin,
}

impl Role {
	/// Assigned when a profile has no role at all.
	pub const DEFAULT: Role = Role::IndividualBasic;

	pub fn all() -> &'static [Role] {
		&[
			Role::Individual,
			Role::TeamMember,
			Role::TeamManager,
			Role::Administrator,
			Role::IndividualBasic,
			Role::IndividualProfessional,
			Role::TeamAnalyst,
			Role::TeamHunter,
			Role::TeamResearcher,
			Role::TeamRed,
			Role::TeamBlue,
			Role::TeamLead,
			Role::SecurityManager,
			Role::CisoDirector,
			Role::PlatformAdmin,
			Role::KnowledgeAdmin,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Individual => "individual",
			Role::TeamMember => "team_member",
			Role::TeamManager => "team_manager",
			Role::Administrator => "administrator",
			Role::IndividualBasic => "individual_basic",
			Role::IndividualProfessional => "individual_professional",
			Role::TeamAnalyst => "team_analyst",
			Role::TeamHunter => "team_hunter",
			Role::TeamResearcher => "team_researcher",
			Role::TeamRed => "team_red",
			Role::TeamBlue => "team_blue",
			Role::TeamLead => "team_lead",
			Role::SecurityManager => "security_manager",
			Role::CisoDirector => "ciso_director",
			Role::PlatformAdmin => "platform_admin",
			Role::KnowledgeAdmin => "knowledge_admin",
		}
	}

	pub fn is_detailed(&self) -> bool {
		!matches!(
			self,
			Role::Individual | Role::TeamMember | Role::TeamManager | Role::Administrator
		)
	}

	/// The basic role this role rolls up to.
	pub fn basic(&self) -> BasicRole {
		match self {
			Role::Individual | Role::IndividualBasic | Role::IndividualProfessional => {
				BasicRole::Individual
			}
			Role::TeamMember
			| Role::TeamAnalyst
			| Role::TeamHunter
			| Role::TeamResearcher
			| Role::TeamRed
			| Role::TeamBlue => BasicRole::TeamMember,
			Role::TeamManager | Role::TeamLead | Role::SecurityManager | Role::CisoDirector => {
				BasicRole::TeamManager
			}
			Role::Administrator | Role::PlatformAdmin | Role::KnowledgeAdmin => {
				BasicRole::Administrator
			}
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Role::all()
			.iter()
			.copied()
			.find(|r| r.as_str() == s)
			.ok_or_else(|| ParseEnumError::new("role", s))
	}
}

/// Role names from the pre-tier permission model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyRole {
	Admin,
	Manager,
	Editor,
	Analyst,
	Viewer,
	User,
}

impl LegacyRole {
	pub fn all() -> &'static [LegacyRole] {
		&[
			LegacyRole::Admin,
			LegacyRole::Manager,
			LegacyRole::Editor,
			LegacyRole::Analyst,
			LegacyRole::Viewer,
			LegacyRole::User,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			LegacyRole::Admin => "admin",
			LegacyRole::Manager => "manager",
			LegacyRole::Editor => "editor",
			LegacyRole::Analyst => "analyst",
			LegacyRole::Viewer => "viewer",
			LegacyRole::User => "user",
		}
	}

	/// One-way translation into the current model.
	pub fn to_current(self) -> Role {
		match self {
			LegacyRole::Admin => Role::PlatformAdmin,
			LegacyRole::Manager => Role::SecurityManager,
			LegacyRole::Editor | LegacyRole::Analyst => Role::TeamAnalyst,
			LegacyRole::Viewer | LegacyRole::User => Role::IndividualBasic,
		}
	}
}

impl fmt::Display for LegacyRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for LegacyRole {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		LegacyRole::all()
			.iter()
			.copied()
			.find(|r| r.as_str() == s)
			.ok_or_else(|| ParseEnumError::new("legacy role", s))
	}
}

/// A role value as found in the store: current or legacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredRole {
	Current(Role),
	Legacy(LegacyRole),
}

impl FromStr for StoredRole {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if let Ok(role) = s.parse::<Role>() {
			return Ok(StoredRole::Current(role));
		}
		s.parse::<LegacyRole>()
			.map(StoredRole::Legacy)
			.map_err(|_| ParseEnumError::new("role", s))
	}
}
