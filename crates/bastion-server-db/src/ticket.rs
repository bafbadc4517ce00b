// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ticket repository.
//!
//! A ticket change and the activity entries describing it are always written
//! in the same transaction, so the activity log never disagrees with the
//! ticket row.

use async_trait::async_trait;
use bastion_auth_core::{
	ActivityAction, TeamId, Ticket, TicketActivity, TicketId, TicketStatus, UserId,
};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, Row, Sqlite, Transaction};

use crate::error::DbError;
use crate::row::{parse_column, parse_optional, parse_timestamp};

const DEFAULT_LIST_LIMIT: i64 = 100;

/// The user a listing is for. Only tickets they created, are assigned or
/// that belong to their team are returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TicketScope {
	pub user_id: UserId,
	pub team_id: Option<TeamId>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
	pub scope: Option<TicketScope>,
	pub team_id: Option<TeamId>,
	pub status: Option<TicketStatus>,
	pub assignee_id: Option<UserId>,
	pub limit: Option<i64>,
}

#[async_trait]
pub trait TicketStore: Send + Sync {
	async fn create_ticket(&self, ticket: &Ticket, activity: &TicketActivity) -> Result<(), DbError>;
	async fn get_ticket(&self, id: &TicketId) -> Result<Option<Ticket>, DbError>;
	async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, DbError>;
	async fn update_ticket(
		&self,
		ticket: &Ticket,
		expected_updated_at: DateTime<Utc>,
		activities: &[TicketActivity],
	) -> Result<(), DbError>;
	async fn list_activity(&self, ticket_id: &TicketId) -> Result<Vec<TicketActivity>, DbError>;
}

#[derive(Clone)]
pub struct TicketRepository {
	pool: SqlitePool,
}

impl TicketRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	/// Insert a new ticket together with its `created` activity entry.
	#[tracing::instrument(skip(self, ticket, activity), fields(ticket_id = %ticket.id))]
	pub async fn create_ticket(
		&self,
		ticket: &Ticket,
		activity: &TicketActivity,
	) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;

		sqlx::query(
			r#"
			INSERT INTO tickets (id, title, description, status, priority, assignee_id,
				created_by, team_id, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(ticket.id.to_string())
		.bind(&ticket.title)
		.bind(&ticket.description)
		.bind(ticket.status.as_str())
		.bind(ticket.priority.as_str())
		.bind(ticket.assignee_id.map(|u| u.to_string()))
		.bind(ticket.created_by.to_string())
		.bind(ticket.team_id.map(|t| t.to_string()))
		.bind(ticket.created_at.to_rfc3339())
		.bind(ticket.updated_at.to_rfc3339())
		.execute(&mut *tx)
		.await?;

		insert_activity(&mut tx, activity).await?;
		tx.commit().await?;

		tracing::debug!(ticket_id = %ticket.id, "ticket created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(ticket_id = %id))]
	pub async fn get_ticket(&self, id: &TicketId) -> Result<Option<Ticket>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT id, title, description, status, priority, assignee_id,
				created_by, team_id, created_at, updated_at
			FROM tickets
			WHERE id = ?
			"#,
		)
		.bind(id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_ticket(&r)).transpose()
	}

	/// Most recently updated first.
	#[tracing::instrument(skip(self, filter))]
	pub async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, DbError> {
		let viewer = filter.scope.map(|s| s.user_id.to_string());
		let rows = sqlx::query(
			r#"
			SELECT id, title, description, status, priority, assignee_id,
				created_by, team_id, created_at, updated_at
			FROM tickets
			WHERE (? IS NULL
					OR created_by = ?
					OR assignee_id = ?
					OR (team_id IS NOT NULL AND team_id = ?))
				AND (? IS NULL OR team_id = ?)
				AND (? IS NULL OR status = ?)
				AND (? IS NULL OR assignee_id = ?)
			ORDER BY updated_at DESC
			LIMIT ?
			"#,
		)
		.bind(viewer.clone())
		.bind(viewer.clone())
		.bind(viewer)
		.bind(filter.scope.and_then(|s| s.team_id).map(|t| t.to_string()))
		.bind(filter.team_id.map(|t| t.to_string()))
		.bind(filter.team_id.map(|t| t.to_string()))
		.bind(filter.status.map(|s| s.as_str()))
		.bind(filter.status.map(|s| s.as_str()))
		.bind(filter.assignee_id.map(|u| u.to_string()))
		.bind(filter.assignee_id.map(|u| u.to_string()))
		.bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 500))
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_ticket).collect()
	}

	/// Write the updated ticket and its activity entries atomically.
	///
	/// # Errors
	/// Returns `DbError::Conflict` if the ticket changed since it was read
	/// (its `updated_at` no longer matches `expected_updated_at`), and
	/// `DbError::NotFound` if it no longer exists. Nothing is written in
	/// either case.
	#[tracing::instrument(
		skip(self, ticket, activities),
		fields(ticket_id = %ticket.id, activity_count = activities.len())
	)]
	pub async fn update_ticket(
		&self,
		ticket: &Ticket,
		expected_updated_at: DateTime<Utc>,
		activities: &[TicketActivity],
	) -> Result<(), DbError> {
		let mut tx = self.pool.begin().await?;

		let result = sqlx::query(
			r#"
			UPDATE tickets SET
				title = ?, description = ?, status = ?, priority = ?,
				assignee_id = ?, updated_at = ?
			WHERE id = ? AND updated_at = ?
			"#,
		)
		.bind(&ticket.title)
		.bind(&ticket.description)
		.bind(ticket.status.as_str())
		.bind(ticket.priority.as_str())
		.bind(ticket.assignee_id.map(|u| u.to_string()))
		.bind(ticket.updated_at.to_rfc3339())
		.bind(ticket.id.to_string())
		.bind(expected_updated_at.to_rfc3339())
		.execute(&mut *tx)
		.await?;

		if result.rows_affected() == 0 {
			let exists = sqlx::query("SELECT 1 FROM tickets WHERE id = ?")
				.bind(ticket.id.to_string())
				.fetch_optional(&mut *tx)
				.await?
				.is_some();
			tx.rollback().await?;
			return Err(if exists {
				DbError::Conflict(format!("ticket {} was modified concurrently", ticket.id))
			} else {
				DbError::NotFound(format!("ticket {}", ticket.id))
			});
		}

		for activity in activities {
			insert_activity(&mut tx, activity).await?;
		}
		tx.commit().await?;

		tracing::debug!(ticket_id = %ticket.id, activity_count = activities.len(), "ticket updated");
		Ok(())
	}

	/// Oldest first.
	#[tracing::instrument(skip(self), fields(ticket_id = %ticket_id))]
	pub async fn list_activity(&self, ticket_id: &TicketId) -> Result<Vec<TicketActivity>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT id, ticket_id, actor_id, action, details, created_at
			FROM ticket_activity
			WHERE ticket_id = ?
			ORDER BY created_at, rowid
			"#,
		)
		.bind(ticket_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_activity).collect()
	}
}

async fn insert_activity(
	tx: &mut Transaction<'_, Sqlite>,
	activity: &TicketActivity,
) -> Result<(), DbError> {
	sqlx::query(
		r#"
		INSERT INTO ticket_activity (id, ticket_id, actor_id, action, details, created_at)
		VALUES (?, ?, ?, ?, ?, ?)
		"#,
	)
	.bind(activity.id.to_string())
	.bind(activity.ticket_id.to_string())
	.bind(activity.actor_id.to_string())
	.bind(activity.action.as_str())
	.bind(serde_json::to_string(&activity.details)?)
	.bind(activity.created_at.to_rfc3339())
	.execute(&mut **tx)
	.await?;
	Ok(())
}

fn row_to_ticket(row: &sqlx::sqlite::SqliteRow) -> Result<Ticket, DbError> {
	let id: String = row.get("id");
	let status: String = row.get("status");
	let priority: String = row.get("priority");
	let assignee_id: Option<String> = row.get("assignee_id");
	let created_by: String = row.get("created_by");
	let team_id: Option<String> = row.get("team_id");
	let created_at: String = row.get("created_at");
	let updated_at: String = row.get("updated_at");

	Ok(Ticket {
		id: parse_column(&id, "ticket id")?,
		title: row.get("title"),
		description: row.get("description"),
		status: parse_column(&status, "status")?,
		priority: parse_column(&priority, "priority")?,
		assignee_id: parse_optional(assignee_id, "assignee_id")?,
		created_by: parse_column(&created_by, "created_by")?,
		team_id: parse_optional(team_id, "team_id")?,
		created_at: parse_timestamp(&created_at, "created_at")?,
		updated_at: parse_timestamp(&updated_at, "updated_at")?,
	})
}

fn row_to_activity(row: &sqlx::sqlite::SqliteRow) -> Result<TicketActivity, DbError> {
	let id: String = row.get("id");
	let ticket_id: String = row.get("ticket_id");
	let actor_id: String = row.get("actor_id");
	let action: String = row.get("action");
	let details: String = row.get("details");
	let created_at: String = row.get("created_at");

	Ok(TicketActivity {
		id: parse_column(&id, "activity id")?,
		ticket_id: parse_column(&ticket_id, "ticket_id")?,
		actor_id: parse_column(&actor_id, "actor_id")?,
		action: parse_column::<ActivityAction>(&action, "action")?,
		details: serde_json::from_str(&details)?,
		created_at: parse_timestamp(&created_at, "created_at")?,
	})
}

#[async_trait]
impl TicketStore for TicketRepository {
	async fn create_ticket(&self, ticket: &Ticket, activity: &TicketActivity) -> Result<(), DbError> {
		self.create_ticket(ticket, activity).await
	}

	async fn get_ticket(&self, id: &TicketId) -> Result<Option<Ticket>, DbError> {
		self.get_ticket(id).await
	}

	async fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, DbError> {
		self.list_tickets(filter).await
	}

	async fn update_ticket(
		&self,
		ticket: &Ticket,
		expected_updated_at: DateTime<Utc>,
		activities: &[TicketActivity],
	) -> Result<(), DbError> {
		self.update_ticket(ticket, expected_updated_at, activities).await
	}

	async fn list_activity(&self, ticket_id: &TicketId) -> Result<Vec<TicketActivity>, DbError> {
		self.list_activity(ticket_id).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use bastion_auth_core::{TicketDraft, TicketPatch, TicketPriority};

	fn draft(title: &str) -> TicketDraft {
		TicketDraft {
			title: title.to_string(),
			description: "Suspicious login burst".to_string(),
			priority: TicketPriority::High,
			assignee_id: None,
		}
	}

	async fn seeded() -> (TicketRepository, Ticket, UserId) {
		let repo = TicketRepository::new(create_test_pool().await);
		let actor = UserId::generate();
		let (ticket, created) = draft("Investigate VPN").into_ticket(actor, None);
		repo.create_ticket(&ticket, &created).await.unwrap();
		(repo, ticket, actor)
	}

	#[tokio::test]
	async fn create_writes_ticket_and_created_entry() {
		let (repo, ticket, actor) = seeded().await;

		let loaded = repo.get_ticket(&ticket.id).await.unwrap().unwrap();
		assert_eq!(loaded, ticket);

		let log = repo.list_activity(&ticket.id).await.unwrap();
		assert_eq!(log.len(), 1);
		assert_eq!(log[0].action, ActivityAction::Created);
		assert_eq!(log[0].actor_id, actor);
	}

	#[tokio::test]
	async fn update_appends_activity_in_order() {
		let (repo, ticket, actor) = seeded().await;

		let patch = TicketPatch {
			status: Some(TicketStatus::InProgress),
			assignee_id: Some(Some(actor)),
			..TicketPatch::default()
		};
		let (next, entries) = patch.apply(&ticket, actor);
		repo.update_ticket(&next, ticket.updated_at, &entries).await.unwrap();

		let loaded = repo.get_ticket(&ticket.id).await.unwrap().unwrap();
		assert_eq!(loaded.status, TicketStatus::InProgress);
		assert_eq!(loaded.assignee_id, Some(actor));

		let actions: Vec<ActivityAction> = repo
			.list_activity(&ticket.id)
			.await
			.unwrap()
			.into_iter()
			.map(|a| a.action)
			.collect();
		assert_eq!(
			actions,
			[
				ActivityAction::Created,
				ActivityAction::StatusChanged,
				ActivityAction::Assigned
			]
		);
	}

	#[tokio::test]
	async fn stale_update_writes_nothing() {
		let (repo, ticket, actor) = seeded().await;

		let first = TicketPatch {
			priority: Some(TicketPriority::Critical),
			..TicketPatch::default()
		};
		let (next, entries) = first.apply(&ticket, actor);
		repo.update_ticket(&next, ticket.updated_at, &entries).await.unwrap();

		// Second writer still holds the original snapshot.
		let second = TicketPatch {
			status: Some(TicketStatus::Closed),
			..TicketPatch::default()
		};
		let (stale, stale_entries) = second.apply(&ticket, actor);
		let err = repo
			.update_ticket(&stale, ticket.updated_at, &stale_entries)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::Conflict(_)));

		let loaded = repo.get_ticket(&ticket.id).await.unwrap().unwrap();
		assert_eq!(loaded.status, TicketStatus::Open);
		assert_eq!(repo.list_activity(&ticket.id).await.unwrap().len(), 2);
	}

	#[tokio::test]
	async fn failed_activity_insert_rolls_back_ticket() {
		let (repo, ticket, actor) = seeded().await;

		let patch = TicketPatch {
			status: Some(TicketStatus::Resolved),
			..TicketPatch::default()
		};
		let (next, mut entries) = patch.apply(&ticket, actor);
		// Reusing the created entry's id violates the primary key.
		let existing = repo.list_activity(&ticket.id).await.unwrap();
		entries[0].id = existing[0].id;

		assert!(repo.update_ticket(&next, ticket.updated_at, &entries).await.is_err());

		let loaded = repo.get_ticket(&ticket.id).await.unwrap().unwrap();
		assert_eq!(loaded.status, TicketStatus::Open);
		assert_eq!(loaded.updated_at, ticket.updated_at);
	}

	#[tokio::test]
	async fn update_of_missing_ticket_is_not_found() {
		let (repo, ticket, actor) = seeded().await;
		let mut ghost = ticket.clone();
		ghost.id = TicketId::generate();
		let (next, entries) = TicketPatch {
			status: Some(TicketStatus::Closed),
			..TicketPatch::default()
		}
		.apply(&ghost, actor);

		let err = repo
			.update_ticket(&next, ghost.updated_at, &entries)
			.await
			.unwrap_err();
		assert!(matches!(err, DbError::NotFound(_)));
	}

	#[tokio::test]
	async fn list_filters_by_team_and_status() {
		let repo = TicketRepository::new(create_test_pool().await);
		let actor = UserId::generate();
		let team = TeamId::generate();

		for (title, team_id) in [("A", Some(team)), ("B", Some(team)), ("C", None)] {
			let (ticket, created) = draft(title).into_ticket(actor, team_id);
			repo.create_ticket(&ticket, &created).await.unwrap();
		}

		let team_tickets = repo
			.list_tickets(&TicketFilter {
				team_id: Some(team),
				..TicketFilter::default()
			})
			.await
			.unwrap();
		assert_eq!(team_tickets.len(), 2);

		let closed = repo
			.list_tickets(&TicketFilter {
				status: Some(TicketStatus::Closed),
				..TicketFilter::default()
			})
			.await
			.unwrap();
		assert!(closed.is_empty());

		assert_eq!(repo.list_tickets(&TicketFilter::default()).await.unwrap().len(), 3);
	}

	#[tokio::test]
	async fn scoped_listing_hides_other_workspaces() {
		let repo = TicketRepository::new(create_test_pool().await);
		let alice = UserId::generate();
		let bob = UserId::generate();
		let carol = UserId::generate();
		let red = TeamId::generate();

		let (mine, created) = draft("Alice personal").into_ticket(alice, None);
		repo.create_ticket(&mine, &created).await.unwrap();
		let (red_ticket, created) = draft("Red team").into_ticket(alice, Some(red));
		repo.create_ticket(&red_ticket, &created).await.unwrap();
		let mut assigned_draft = draft("Handed to Bob");
		assigned_draft.assignee_id = Some(bob);
		let (assigned, created) = assigned_draft.into_ticket(alice, None);
		repo.create_ticket(&assigned, &created).await.unwrap();

		let titles = |tickets: Vec<Ticket>| {
			let mut titles: Vec<String> = tickets.into_iter().map(|t| t.title).collect();
			titles.sort();
			titles
		};
		let scoped = |user_id, team_id| TicketFilter {
			scope: Some(TicketScope { user_id, team_id }),
			..TicketFilter::default()
		};

		assert_eq!(repo.list_tickets(&scoped(alice, None)).await.unwrap().len(), 3);
		assert_eq!(
			titles(repo.list_tickets(&scoped(bob, Some(red))).await.unwrap()),
			["Handed to Bob", "Red team"]
		);
		assert!(repo
			.list_tickets(&scoped(carol, Some(TeamId::generate())))
			.await
			.unwrap()
			.is_empty());
		assert!(repo.list_tickets(&scoped(carol, None)).await.unwrap().is_empty());
	}
}
