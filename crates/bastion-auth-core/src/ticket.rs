// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tickets and their activity log.
//!
//! A [`TicketPatch`] knows both how to change a ticket and which activity
//! entries describe that change, so the store can write both in one
//! transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

use crate::error::{check_text, ParseEnumError, ValidationError};
use crate::types::{ActivityId, TeamId, TicketId, UserId};

macro_rules! string_enum {
	($name:ident, $kind:expr, { $($variant:ident => $text:literal),+ $(,)? }) => {
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(rename_all = "snake_case")]
		pub enum $name {
			$($variant),+
		}

		impl $name {
			pub fn as_str(&self) -> &'static str {
				match self {
					$($name::$variant => $text),+
				}
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(self.as_str())
			}
		}

		impl FromStr for $name {
			type Err = ParseEnumError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				match s {
					$($text => Ok($name::$variant),)+
					_ => Err(ParseEnumError::new($kind, s)),
				}
			}
		}
	};
}

string_enum!(TicketStatus, "ticket status", {
	Open => "open",
	InProgress => "in_progress",
	Resolved => "resolved",
	Closed => "closed",
});

string_enum!(TicketPriority, "ticket priority", {
	Low => "low",
	Medium => "medium",
	High => "high",
	Critical => "critical",
});

string_enum!(ActivityAction, "activity action", {
	Created => "created",
	StatusChanged => "status_changed",
	PriorityChanged => "priority_changed",
	Assigned => "assigned",
	Edited => "edited",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
	pub id: TicketId,
	pub title: String,
	pub description: String,
	pub status: TicketStatus,
	pub priority: TicketPriority,
	pub assignee_id: Option<UserId>,
	pub created_by: UserId,
	pub team_id: Option<TeamId>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Ticket {
	/// Tickets are shared with their creator, their assignee and the members
	/// of the team they were filed under.
	pub fn accessible_to(&self, user: UserId, team: Option<TeamId>) -> bool {
		self.created_by == user
			|| self.assignee_id == Some(user)
			|| (self.team_id.is_some() && self.team_id == team)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketActivity {
	pub id: ActivityId,
	pub ticket_id: TicketId,
	pub actor_id: UserId,
	pub action: ActivityAction,
	pub details: serde_json::Value,
	pub created_at: DateTime<Utc>,
}

impl TicketActivity {
	pub fn new(
		ticket_id: TicketId,
		actor_id: UserId,
		action: ActivityAction,
		details: serde_json::Value,
	) -> Self {
		Self {
			id: ActivityId::generate(),
			ticket_id,
			actor_id,
			action,
			details,
			created_at: Utc::now(),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TicketDraft {
	pub title: String,
	#[serde(default)]
	pub description: String,
	#[serde(default = "default_priority")]
	pub priority: TicketPriority,
	#[serde(default)]
	pub assignee_id: Option<UserId>,
}

fn default_priority() -> TicketPriority {
	TicketPriority::Medium
}

impl TicketDraft {
	pub fn validate(&self) -> Result<(), ValidationError> {
		check_text("title", &self.title, 200, true)?;
		check_text("description", &self.description, 20_000, false)
	}

	/// Builds the ticket plus its `created` activity entry.
	pub fn into_ticket(
		self,
		created_by: UserId,
		team_id: Option<TeamId>,
	) -> (Ticket, TicketActivity) {
		let now = Utc::now();
		let ticket = Ticket {
			id: TicketId::generate(),
			title: self.title.trim().to_string(),
			description: self.description,
			status: TicketStatus::Open,
			priority: self.priority,
			assignee_id: self.assignee_id,
			created_by,
			team_id,
			created_at: now,
			updated_at: now,
		};
		let activity = TicketActivity::new(
			ticket.id,
			created_by,
			ActivityAction::Created,
			json!({ "title": ticket.title, "priority": ticket.priority }),
		);
		(ticket, activity)
	}
}

/// Absent fields are left alone. `assignee_id: null` unassigns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TicketPatch {
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub status: Option<TicketStatus>,
	#[serde(default)]
	pub priority: Option<TicketPriority>,
	#[serde(default, deserialize_with = "present_or_null")]
	pub assignee_id: Option<Option<UserId>>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
	D: Deserializer<'de>,
	T: Deserialize<'de>,
{
	Option::<T>::deserialize(deserializer).map(Some)
}

impl TicketPatch {
	pub fn validate(&self) -> Result<(), ValidationError> {
		if let Some(title) = &self.title {
			check_text("title", title, 200, true)?;
		}
		if let Some(description) = &self.description {
			check_text("description", description, 20_000, false)?;
		}
		Ok(())
	}

	/// Whether the patch reassigns the ticket.
	pub fn changes_assignee(&self, ticket: &Ticket) -> bool {
		matches!(self.assignee_id, Some(a) if a != ticket.assignee_id)
	}

	/// Returns the updated ticket and one activity entry per changed aspect.
	/// Fields set to their current value produce no entry.
	pub fn apply(&self, ticket: &Ticket, actor: UserId) -> (Ticket, Vec<TicketActivity>) {
		let mut next = ticket.clone();
		let mut log = Vec::new();
		let mut record = |action, details| {
			log.push(TicketActivity::new(ticket.id, actor, action, details));
		};

		if let Some(status) = self.status.filter(|s| *s != ticket.status) {
			record(
				ActivityAction::StatusChanged,
				json!({ "from": ticket.status, "to": status }),
			);
			next.status = status;
		}
		if let Some(priority) = self.priority.filter(|p| *p != ticket.priority) {
			record(
				ActivityAction::PriorityChanged,
				json!({ "from": ticket.priority, "to": priority }),
			);
			next.priority = priority;
		}
		if let Some(assignee) = self.assignee_id.filter(|a| *a != ticket.assignee_id) {
			record(
				ActivityAction::Assigned,
				json!({ "from": ticket.assignee_id, "to": assignee }),
			);
			next.assignee_id = assignee;
		}

		let mut edited = Vec::new();
		if let Some(title) = self.title.as_deref().map(str::trim) {
			if title != ticket.title {
				next.title = title.to_string();
				edited.push("title");
			}
		}
		if let Some(description) = &self.description {
			if *description != ticket.description {
				next.description = description.clone();
				edited.push("description");
			}
		}
		if !edited.is_empty() {
			record(ActivityAction::Edited, json!({ "fields": edited }));
		}

		if !log.is_empty() {
			next.updated_at = Utc::now();
		}
		(next, log)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ticket() -> Ticket {
		let (ticket, _) = TicketDraft {
			title: "Phishing wave".to_string(),
			description: "Multiple reports".to_string(),
			priority: TicketPriority::High,
			assignee_id: None,
		}
		.into_ticket(UserId::generate(), None);
		ticket
	}

	#[test]
	fn draft_creates_open_ticket_with_created_activity() {
		let creator = UserId::generate();
		let (ticket, activity) = TicketDraft {
			title: "  Beaconing host  ".to_string(),
			description: String::new(),
			priority: TicketPriority::Critical,
			assignee_id: None,
		}
		.into_ticket(creator, None);
		assert_eq!(ticket.status, TicketStatus::Open);
		assert_eq!(ticket.title, "Beaconing host");
		assert_eq!(activity.action, ActivityAction::Created);
		assert_eq!(activity.actor_id, creator);
		assert_eq!(activity.details["priority"], "critical");
	}

	#[test]
	fn access_is_limited_to_creator_assignee_and_team() {
		let team = TeamId::generate();
		let creator = UserId::generate();
		let assignee = UserId::generate();
		let (mut filed, _) = TicketDraft {
			title: "Phishing wave".to_string(),
			description: String::new(),
			priority: TicketPriority::High,
			assignee_id: Some(assignee),
		}
		.into_ticket(creator, Some(team));

		assert!(filed.accessible_to(creator, None));
		assert!(filed.accessible_to(assignee, None));
		assert!(filed.accessible_to(UserId::generate(), Some(team)));
		assert!(!filed.accessible_to(UserId::generate(), Some(TeamId::generate())));
		assert!(!filed.accessible_to(UserId::generate(), None));

		filed.team_id = None;
		assert!(!filed.accessible_to(UserId::generate(), None));
	}

	#[test]
	fn blank_title_is_rejected() {
		let draft: TicketDraft = serde_json::from_str(r#"{"title": "   "}"#).unwrap();
		assert_eq!(draft.priority, TicketPriority::Medium);
		assert_eq!(draft.validate().unwrap_err().field, "title");
	}

	#[test]
	fn patch_logs_each_changed_aspect() {
		let before = ticket();
		let actor = UserId::generate();
		let assignee = UserId::generate();
		let patch = TicketPatch {
			status: Some(TicketStatus::InProgress),
			priority: Some(TicketPriority::High),
			assignee_id: Some(Some(assignee)),
			title: Some("Phishing wave (finance)".to_string()),
			description: None,
		};

		let (after, log) = patch.apply(&before, actor);
		assert_eq!(after.status, TicketStatus::InProgress);
		assert_eq!(after.assignee_id, Some(assignee));
		let actions: Vec<_> = log.iter().map(|a| a.action).collect();
		assert_eq!(
			actions,
			[ActivityAction::StatusChanged, ActivityAction::Assigned, ActivityAction::Edited]
		);
		assert_eq!(log[0].details["from"], "open");
		assert_eq!(log[0].details["to"], "in_progress");
		assert!(log.iter().all(|a| a.actor_id == actor && a.ticket_id == before.id));
	}

	#[test]
	fn noop_patch_changes_nothing() {
		let before = ticket();
		let patch = TicketPatch {
			status: Some(before.status),
			title: Some(before.title.clone()),
			..Default::default()
		};
		let (after, log) = patch.apply(&before, UserId::generate());
		assert!(log.is_empty());
		assert_eq!(after, before);
	}

	#[test]
	fn explicit_null_unassigns_and_missing_keeps() {
		let missing: TicketPatch = serde_json::from_str("{}").unwrap();
		assert_eq!(missing.assignee_id, None);

		let null: TicketPatch = serde_json::from_str(r#"{"assignee_id": null}"#).unwrap();
		assert_eq!(null.assignee_id, Some(None));

		let mut assigned = ticket();
		assigned.assignee_id = Some(UserId::generate());
		assert!(null.changes_assignee(&assigned));
		let (after, log) = null.apply(&assigned, UserId::generate());
		assert_eq!(after.assignee_id, None);
		assert_eq!(log[0].action, ActivityAction::Assigned);
	}

	#[test]
	fn status_names() {
		assert_eq!("in_progress".parse::<TicketStatus>().unwrap(), TicketStatus::InProgress);
		assert!("pending".parse::<TicketStatus>().is_err());
	}
}
