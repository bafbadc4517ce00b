// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Static role → permission tables.
//!
//! Permissions are `area:action` keys. Each role owns a fixed set; there is
//! no inheritance, wildcarding or runtime configuration. A check against a
//! list of permissions passes only when the role holds every one of them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseEnumError;
use crate::role::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
	#[serde(rename = "documents:read")]
	DocumentsRead,
	#[serde(rename = "documents:write")]
	DocumentsWrite,
	#[serde(rename = "documents:classify")]
	DocumentsClassify,
	#[serde(rename = "tickets:read")]
	TicketsRead,
	#[serde(rename = "tickets:write")]
	TicketsWrite,
	#[serde(rename = "tickets:assign")]
	TicketsAssign,
	#[serde(rename = "dashboards:view")]
	DashboardsView,
	#[serde(rename = "dashboards:executive")]
	DashboardsExecutive,
	#[serde(rename = "intel:read")]
	IntelRead,
	#[serde(rename = "intel:write")]
	IntelWrite,
	#[serde(rename = "hunts:run")]
	HuntsRun,
	#[serde(rename = "offense:operate")]
	OffenseOperate,
	#[serde(rename = "defense:operate")]
	DefenseOperate,
	#[serde(rename = "team:view")]
	TeamView,
	#[serde(rename = "team:manage")]
	TeamManage,
	#[serde(rename = "users:manage")]
	UsersManage,
	#[serde(rename = "billing:manage")]
	BillingManage,
	#[serde(rename = "knowledge:manage")]
	KnowledgeManage,
	#[serde(rename = "platform:admin")]
	PlatformAdmin,
	#[serde(rename = "ai:suggest")]
	AiSuggest,
}

use Permission::*;

impl Permission {
	pub fn all() -> &'static [Permission] {
		&[
			DocumentsRead,
			DocumentsWrite,
			DocumentsClassify,
			TicketsRead,
			TicketsWrite,
			TicketsAssign,
			DashboardsView,
			DashboardsExecutive,
			IntelRead,
			IntelWrite,
			HuntsRun,
			OffenseOperate,
			DefenseOperate,
			TeamView,
			TeamManage,
			UsersManage,
			BillingManage,
			KnowledgeManage,
			PlatformAdmin,
			AiSuggest,
		]
	}

	pub fn key(&self) -> &'static str {
		match self {
			DocumentsRead => "documents:read",
			DocumentsWrite => "documents:write",
			DocumentsClassify => "documents:classify",
			TicketsRead => "tickets:read",
			TicketsWrite => "tickets:write",
			TicketsAssign => "tickets:assign",
			DashboardsView => "dashboards:view",
			DashboardsExecutive => "dashboards:executive",
			IntelRead => "intel:read",
			IntelWrite => "intel:write",
			HuntsRun => "hunts:run",
			OffenseOperate => "offense:operate",
			DefenseOperate => "defense:operate",
			TeamView => "team:view",
			TeamManage => "team:manage",
			UsersManage => "users:manage",
			BillingManage => "billing:manage",
			KnowledgeManage => "knowledge:manage",
			PlatformAdmin => "platform:admin",
			AiSuggest => "ai:suggest",
		}
	}
}

impl fmt::Display for Permission {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.key())
	}
}

impl FromStr for Permission {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Permission::all()
			.iter()
			.copied()
			.find(|p| p.key() == s)
			.ok_or_else(|| ParseEnumError::new("permission", s))
	}
}

const INDIVIDUAL: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	TicketsRead,
	TicketsWrite,
	DashboardsView,
	AiSuggest,
];

const INDIVIDUAL_PROFESSIONAL: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	DocumentsClassify,
	TicketsRead,
	TicketsWrite,
	DashboardsView,
	IntelRead,
	HuntsRun,
	AiSuggest,
];

const TEAM_MEMBER: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	TicketsRead,
	TicketsWrite,
	DashboardsView,
	IntelRead,
	TeamView,
	AiSuggest,
];

const TEAM_ANALYST: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	TicketsRead,
	TicketsWrite,
	DashboardsView,
	IntelRead,
	IntelWrite,
	TeamView,
	AiSuggest,
];

const TEAM_HUNTER: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	TicketsRead,
	TicketsWrite,
	DashboardsView,
	IntelRead,
	HuntsRun,
	TeamView,
	AiSuggest,
];

const TEAM_RESEARCHER: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	TicketsRead,
	DashboardsView,
	IntelRead,
	IntelWrite,
	TeamView,
	AiSuggest,
];

const TEAM_RED: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	TicketsRead,
	TicketsWrite,
	DashboardsView,
	IntelRead,
	OffenseOperate,
	TeamView,
	AiSuggest,
];

const TEAM_BLUE: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	TicketsRead,
	TicketsWrite,
	DashboardsView,
	IntelRead,
	DefenseOperate,
	TeamView,
	AiSuggest,
];

const TEAM_MANAGER: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	DocumentsClassify,
	TicketsRead,
	TicketsWrite,
	TicketsAssign,
	DashboardsView,
	IntelRead,
	TeamView,
	TeamManage,
	AiSuggest,
];

const TEAM_LEAD: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	DocumentsClassify,
	TicketsRead,
	TicketsWrite,
	TicketsAssign,
	DashboardsView,
	IntelRead,
	IntelWrite,
	HuntsRun,
	TeamView,
	TeamManage,
	AiSuggest,
];

const SECURITY_MANAGER: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	DocumentsClassify,
	TicketsRead,
	TicketsWrite,
	TicketsAssign,
	DashboardsView,
	DashboardsExecutive,
	IntelRead,
	TeamView,
	TeamManage,
	UsersManage,
	AiSuggest,
];

const CISO_DIRECTOR: &[Permission] = &[
	DocumentsRead,
	DocumentsClassify,
	TicketsRead,
	TicketsAssign,
	DashboardsView,
	DashboardsExecutive,
	IntelRead,
	TeamView,
	TeamManage,
	UsersManage,
	BillingManage,
	AiSuggest,
];

const ADMINISTRATOR: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	DocumentsClassify,
	TicketsRead,
	TicketsWrite,
	TicketsAssign,
	DashboardsView,
	DashboardsExecutive,
	TeamView,
	TeamManage,
	UsersManage,
	BillingManage,
	AiSuggest,
];

const PLATFORM_ADMIN: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	DocumentsClassify,
	TicketsRead,
	TicketsWrite,
	TicketsAssign,
	DashboardsView,
	DashboardsExecutive,
	IntelRead,
	IntelWrite,
	HuntsRun,
	TeamView,
	TeamManage,
	UsersManage,
	BillingManage,
	KnowledgeManage,
	PlatformAdmin,
	AiSuggest,
];

const KNOWLEDGE_ADMIN: &[Permission] = &[
	DocumentsRead,
	DocumentsWrite,
	DocumentsClassify,
	TicketsRead,
	DashboardsView,
	IntelRead,
	IntelWrite,
	TeamView,
	KnowledgeManage,
	AiSuggest,
];

impl Role {
	/// Fixed permission set for this role.
	pub fn permissions(&self) -> &'static [Permission] {
		match self {
			Role::Individual | Role::IndividualBasic => INDIVIDUAL,
			Role::IndividualProfessional => INDIVIDUAL_PROFESSIONAL,
			Role::TeamMember => TEAM_MEMBER,
			Role::TeamAnalyst => TEAM_ANALYST,
			Role::TeamHunter => TEAM_HUNTER,
			Role::TeamResearcher => TEAM_RESEARCHER,
			Role::TeamRed => TEAM_RED,
			Role::TeamBlue => TEAM_BLUE,
			Role::TeamManager => TEAM_MANAGER,
			Role::TeamLead => TEAM_LEAD,
			Role::SecurityManager => SECURITY_MANAGER,
			Role::CisoDirector => CISO_DIRECTOR,
			Role::Administrator => ADMINISTRATOR,
			Role::PlatformAdmin => PLATFORM_ADMIN,
			Role::KnowledgeAdmin => KNOWLEDGE_ADMIN,
		}
	}

	pub fn has_permission(&self, permission: Permission) -> bool {
		self.permissions().contains(&permission)
	}
}

/// True iff `role` is present and holds every permission in `required`.
pub fn has_permissions(role: Option<Role>, required: &[Permission]) -> bool {
	match role {
		Some(role) => required.iter().all(|p| role.has_permission(*p)),
		None => false,
	}
}

/// String-keyed form of [`has_permissions`]. Unknown keys are never held.
pub fn has_permission_keys<S: AsRef<str>>(role: Option<Role>, required: &[S]) -> bool {
	let Some(role) = role else {
		return false;
	};
	required.iter().all(|key| {
		key.as_ref()
			.parse::<Permission>()
			.is_ok_and(|p| role.has_permission(p))
	})
}
