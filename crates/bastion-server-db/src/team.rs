// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Team repository: teams and their memberships.

use async_trait::async_trait;
use bastion_auth_core::{Team, TeamId, TeamMembership, TeamRole, UserId};
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::row::{parse_column, parse_timestamp};

#[async_trait]
pub trait TeamStore: Send + Sync {
	async fn create_team(&self, team: &Team) -> Result<(), DbError>;
	async fn get_team(&self, team_id: &TeamId) -> Result<Option<Team>, DbError>;
	async fn list_teams(&self) -> Result<Vec<Team>, DbError>;
	async fn get_membership(
		&self,
		team_id: &TeamId,
		user_id: &UserId,
	) -> Result<Option<TeamMembership>, DbError>;
	async fn add_member(&self, membership: &TeamMembership) -> Result<(), DbError>;
	async fn remove_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<bool, DbError>;
	async fn list_members(&self, team_id: &TeamId) -> Result<Vec<TeamMembership>, DbError>;
}

#[derive(Clone)]
pub struct TeamRepository {
	pool: SqlitePool,
}

impl TeamRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, team), fields(team_id = %team.id, name = %team.name))]
	pub async fn create_team(&self, team: &Team) -> Result<(), DbError> {
		sqlx::query("INSERT INTO teams (id, name, description, created_at) VALUES (?, ?, ?, ?)")
			.bind(team.id.to_string())
			.bind(&team.name)
			.bind(&team.description)
			.bind(team.created_at.to_rfc3339())
			.execute(&self.pool)
			.await?;

		tracing::debug!(team_id = %team.id, "team created");
		Ok(())
	}

	#[tracing::instrument(skip(self), fields(team_id = %team_id))]
	pub async fn get_team(&self, team_id: &TeamId) -> Result<Option<Team>, DbError> {
		let row = sqlx::query("SELECT id, name, description, created_at FROM teams WHERE id = ?")
			.bind(team_id.to_string())
			.fetch_optional(&self.pool)
			.await?;

		row.map(|r| row_to_team(&r)).transpose()
	}

	#[tracing::instrument(skip(self))]
	pub async fn list_teams(&self) -> Result<Vec<Team>, DbError> {
		let rows = sqlx::query("SELECT id, name, description, created_at FROM teams ORDER BY name")
			.fetch_all(&self.pool)
			.await?;

		rows.iter().map(row_to_team).collect()
	}

	#[tracing::instrument(skip(self), fields(team_id = %team_id, user_id = %user_id))]
	pub async fn get_membership(
		&self,
		team_id: &TeamId,
		user_id: &UserId,
	) -> Result<Option<TeamMembership>, DbError> {
		let row = sqlx::query(
			r#"
			SELECT team_id, user_id, role, created_at
			FROM team_memberships
			WHERE team_id = ? AND user_id = ?
			"#,
		)
		.bind(team_id.to_string())
		.bind(user_id.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(|r| row_to_membership(&r)).transpose()
	}

	/// # Errors
	/// Returns `DbError::Conflict` if the user already belongs to the team.
	#[tracing::instrument(
		skip(self, membership),
		fields(team_id = %membership.team_id, user_id = %membership.user_id, role = %membership.role)
	)]
	pub async fn add_member(&self, membership: &TeamMembership) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO team_memberships (team_id, user_id, role, created_at)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(membership.team_id.to_string())
		.bind(membership.user_id.to_string())
		.bind(membership.role.as_str())
		.bind(membership.created_at.to_rfc3339())
		.execute(&self.pool)
		.await
		.map_err(|e| {
			if DbError::is_unique_violation(&e) {
				DbError::Conflict(format!(
					"user {} is already a member of team {}",
					membership.user_id, membership.team_id
				))
			} else {
				e.into()
			}
		})?;

		tracing::debug!(team_id = %membership.team_id, user_id = %membership.user_id, "team member added");
		Ok(())
	}

	/// # Returns
	/// `true` if a membership was removed.
	#[tracing::instrument(skip(self), fields(team_id = %team_id, user_id = %user_id))]
	pub async fn remove_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM team_memberships WHERE team_id = ? AND user_id = ?")
			.bind(team_id.to_string())
			.bind(user_id.to_string())
			.execute(&self.pool)
			.await?;

		let removed = result.rows_affected() > 0;
		if removed {
			tracing::debug!(team_id = %team_id, user_id = %user_id, "team member removed");
		}
		Ok(removed)
	}

	#[tracing::instrument(skip(self), fields(team_id = %team_id))]
	pub async fn list_members(&self, team_id: &TeamId) -> Result<Vec<TeamMembership>, DbError> {
		let rows = sqlx::query(
			r#"
			SELECT team_id, user_id, role, created_at
			FROM team_memberships
			WHERE team_id = ?
			ORDER BY created_at
			"#,
		)
		.bind(team_id.to_string())
		.fetch_all(&self.pool)
		.await?;

		rows.iter().map(row_to_membership).collect()
	}
}

fn row_to_team(row: &sqlx::sqlite::SqliteRow) -> Result<Team, DbError> {
	let id: String = row.get("id");
	let created_at: String = row.get("created_at");

	Ok(Team {
		id: parse_column(&id, "team id")?,
		name: row.get("name"),
		description: row.get("description"),
		created_at: parse_timestamp(&created_at, "created_at")?,
	})
}

fn row_to_membership(row: &sqlx::sqlite::SqliteRow) -> Result<TeamMembership, DbError> {
	let team_id: String = row.get("team_id");
	let user_id: String = row.get("user_id");
	let role: String = row.get("role");
	let created_at: String = row.get("created_at");

	Ok(TeamMembership {
		team_id: parse_column(&team_id, "team_id")?,
		user_id: parse_column(&user_id, "user_id")?,
		role: parse_column::<TeamRole>(&role, "team role")?,
		created_at: parse_timestamp(&created_at, "created_at")?,
	})
}

#[async_trait]
impl TeamStore for TeamRepository {
	async fn create_team(&self, team: &Team) -> Result<(), DbError> {
		self.create_team(team).await
	}

	async fn get_team(&self, team_id: &TeamId) -> Result<Option<Team>, DbError> {
		self.get_team(team_id).await
	}

	async fn list_teams(&self) -> Result<Vec<Team>, DbError> {
		self.list_teams().await
	}

	async fn get_membership(
		&self,
		team_id: &TeamId,
		user_id: &UserId,
	) -> Result<Option<TeamMembership>, DbError> {
		self.get_membership(team_id, user_id).await
	}

	async fn add_member(&self, membership: &TeamMembership) -> Result<(), DbError> {
		self.add_member(membership).await
	}

	async fn remove_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<bool, DbError> {
		self.remove_member(team_id, user_id).await
	}

	async fn list_members(&self, team_id: &TeamId) -> Result<Vec<TeamMembership>, DbError> {
		self.list_members(team_id).await
	}
}
