// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Documents and sensitivity classification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{check_text, ParseEnumError, ValidationError};
use crate::types::{DocumentId, TeamId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
	Public,
	Internal,
	Confidential,
	Restricted,
}

impl Sensitivity {
	pub fn as_str(&self) -> &'static str {
		match self {
			Sensitivity::Public => "public",
			Sensitivity::Internal => "internal",
			Sensitivity::Confidential => "confidential",
			Sensitivity::Restricted => "restricted",
		}
	}
}

impl Default for Sensitivity {
	fn default() -> Self {
		Sensitivity::Internal
	}
}

impl fmt::Display for Sensitivity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Sensitivity {
	type Err = ParseEnumError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"public" => Ok(Sensitivity::Public),
			"internal" => Ok(Sensitivity::Internal),
			"confidential" => Ok(Sensitivity::Confidential),
			"restricted" => Ok(Sensitivity::Restricted),
			_ => Err(ParseEnumError::new("sensitivity", s)),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
	pub id: DocumentId,
	pub owner_id: UserId,
	pub team_id: Option<TeamId>,
	pub title: String,
	pub body: String,
	pub sensitivity: Sensitivity,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Document {
	/// Documents are shared with their owner and the members of their team.
	pub fn in_workspace_of(&self, user: UserId, team: Option<TeamId>) -> bool {
		self.owner_id == user || (self.team_id.is_some() && self.team_id == team)
	}

	/// Within the workspace, restricted documents are visible to their owner
	/// and to classifiers only.
	pub fn visible_to(&self, user: UserId, team: Option<TeamId>, can_classify: bool) -> bool {
		self.in_workspace_of(user, team)
			&& (self.sensitivity != Sensitivity::Restricted || self.owner_id == user || can_classify)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DocumentDraft {
	pub title: String,
	#[serde(default)]
	pub body: String,
	#[serde(default)]
	pub sensitivity: Option<Sensitivity>,
}

impl DocumentDraft {
	pub fn validate(&self) -> Result<(), ValidationError> {
		check_text("title", &self.title, 200, true)?;
		check_text("body", &self.body, 500_000, false)
	}

	pub fn into_document(self, owner_id: UserId, team_id: Option<TeamId>) -> Document {
		let now = Utc::now();
		Document {
			id: DocumentId::generate(),
			owner_id,
			team_id,
			title: self.title.trim().to_string(),
			body: self.body,
			sensitivity: self.sensitivity.unwrap_or_default(),
			created_at: now,
			updated_at: now,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DocumentPatch {
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub body: Option<String>,
	#[serde(default)]
	pub sensitivity: Option<Sensitivity>,
}

impl DocumentPatch {
	pub fn validate(&self) -> Result<(), ValidationError> {
		if let Some(title) = &self.title {
			check_text("title", title, 200, true)?;
		}
		if let Some(body) = &self.body {
			check_text("body", body, 500_000, false)?;
		}
		Ok(())
	}

	pub fn changes_content(&self) -> bool {
		self.title.is_some() || self.body.is_some()
	}

	pub fn changes_sensitivity(&self, document: &Document) -> bool {
		self.sensitivity.is_some_and(|s| s != document.sensitivity)
	}

	pub fn apply(&self, document: &Document) -> Document {
		let mut next = document.clone();
		if let Some(title) = &self.title {
			next.title = title.trim().to_string();
		}
		if let Some(body) = &self.body {
			next.body = body.clone();
		}
		if let Some(sensitivity) = self.sensitivity {
			next.sensitivity = sensitivity;
		}
		next.updated_at = Utc::now();
		next
	}
}
