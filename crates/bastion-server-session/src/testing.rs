// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Store wrappers with switchable failures, and an audit sink that records.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bastion_auth_core::{
	ProfileUpdate, Reconciliation, StoredProfile, Team, TeamId, TeamMembership, UserId,
};
use bastion_server_audit::{
	AuditEventType, AuditFilterConfig, AuditLogEntry, AuditSink, AuditSinkError,
};
use bastion_server_db::{
	DbError, ProfileRepository, ProfileStore, SqlitePool, TeamRepository, TeamStore,
};

fn injected() -> DbError {
	DbError::Internal("injected failure".to_string())
}

pub struct FlakyProfiles {
	inner: ProfileRepository,
	fail_reconcile: AtomicBool,
	fail_team_updates: AtomicBool,
	reconcile_attempts: AtomicUsize,
}

impl FlakyProfiles {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			inner: ProfileRepository::new(pool),
			fail_reconcile: AtomicBool::new(false),
			fail_team_updates: AtomicBool::new(false),
			reconcile_attempts: AtomicUsize::new(0),
		}
	}

	pub fn fail_reconcile(&self, fail: bool) {
		self.fail_reconcile.store(fail, Ordering::SeqCst);
	}

	pub fn fail_team_updates(&self, fail: bool) {
		self.fail_team_updates.store(fail, Ordering::SeqCst);
	}

	pub fn reconcile_attempts(&self) -> usize {
		self.reconcile_attempts.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ProfileStore for FlakyProfiles {
	async fn get_profile(&self, user_id: &UserId) -> Result<Option<StoredProfile>, DbError> {
		self.inner.get_profile(user_id).await
	}

	async fn create_profile(&self, profile: &StoredProfile) -> Result<(), DbError> {
		self.inner.create_profile(profile).await
	}

	async fn ensure_profile(&self, user_id: &UserId) -> Result<bool, DbError> {
		self.inner.ensure_profile(user_id).await
	}

	async fn update_profile(&self, user_id: &UserId, update: &ProfileUpdate) -> Result<(), DbError> {
		self.inner.update_profile(user_id, update).await
	}

	async fn apply_reconciliation(&self, reconciliation: &Reconciliation) -> Result<(), DbError> {
		self.reconcile_attempts.fetch_add(1, Ordering::SeqCst);
		if self.fail_reconcile.load(Ordering::SeqCst) {
			// Pool timeouts are retryable, so the full budget is spent.
			return Err(DbError::Sqlx(sqlx::Error::PoolTimedOut));
		}
		self.inner.apply_reconciliation(reconciliation).await
	}

	async fn set_team(&self, user_id: &UserId, team_id: Option<&TeamId>) -> Result<(), DbError> {
		if self.fail_team_updates.load(Ordering::SeqCst) {
			return Err(injected());
		}
		self.inner.set_team(user_id, team_id).await
	}

	async fn clear_team_if(&self, user_id: &UserId, team_id: &TeamId) -> Result<bool, DbError> {
		if self.fail_team_updates.load(Ordering::SeqCst) {
			return Err(injected());
		}
		self.inner.clear_team_if(user_id, team_id).await
	}
}

pub struct FlakyTeams {
	inner: TeamRepository,
	fail_get_team: AtomicBool,
	fail_add_member: AtomicBool,
	fail_remove_member: AtomicBool,
}

impl FlakyTeams {
	pub fn new(pool: SqlitePool) -> Self {
		Self {
			inner: TeamRepository::new(pool),
			fail_get_team: AtomicBool::new(false),
			fail_add_member: AtomicBool::new(false),
			fail_remove_member: AtomicBool::new(false),
		}
	}

	pub fn fail_get_team(&self, fail: bool) {
		self.fail_get_team.store(fail, Ordering::SeqCst);
	}

	pub fn fail_add_member(&self, fail: bool) {
		self.fail_add_member.store(fail, Ordering::SeqCst);
	}

	pub fn fail_remove_member(&self, fail: bool) {
		self.fail_remove_member.store(fail, Ordering::SeqCst);
	}
}

#[async_trait]
impl TeamStore for FlakyTeams {
	async fn create_team(&self, team: &Team) -> Result<(), DbError> {
		self.inner.create_team(team).await
	}

	async fn get_team(&self, team_id: &TeamId) -> Result<Option<Team>, DbError> {
		if self.fail_get_team.load(Ordering::SeqCst) {
			return Err(injected());
		}
		self.inner.get_team(team_id).await
	}

	async fn list_teams(&self) -> Result<Vec<Team>, DbError> {
		self.inner.list_teams().await
	}

	async fn get_membership(
		&self,
		team_id: &TeamId,
		user_id: &UserId,
	) -> Result<Option<TeamMembership>, DbError> {
		self.inner.get_membership(team_id, user_id).await
	}

	async fn add_member(&self, membership: &TeamMembership) -> Result<(), DbError> {
		if self.fail_add_member.load(Ordering::SeqCst) {
			return Err(injected());
		}
		self.inner.add_member(membership).await
	}

	async fn remove_member(&self, team_id: &TeamId, user_id: &UserId) -> Result<bool, DbError> {
		if self.fail_remove_member.load(Ordering::SeqCst) {
			return Err(injected());
		}
		self.inner.remove_member(team_id, user_id).await
	}

	async fn list_members(&self, team_id: &TeamId) -> Result<Vec<TeamMembership>, DbError> {
		self.inner.list_members(team_id).await
	}
}

#[derive(Default)]
pub struct RecordingSink {
	filter: AuditFilterConfig,
	entries: Mutex<Vec<Arc<AuditLogEntry>>>,
}

impl RecordingSink {
	pub fn entries_of(&self, event_type: AuditEventType) -> Vec<Arc<AuditLogEntry>> {
		self.entries
			.lock()
			.unwrap()
			.iter()
			.filter(|e| e.event_type == event_type)
			.cloned()
			.collect()
	}

	pub fn count(&self, event_type: AuditEventType) -> usize {
		self.entries_of(event_type).len()
	}
}

#[async_trait]
impl AuditSink for RecordingSink {
	fn name(&self) -> &str {
		"recording"
	}

	fn filter(&self) -> &AuditFilterConfig {
		&self.filter
	}

	async fn publish(&self, entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		self.entries.lock().unwrap().push(entry);
		Ok(())
	}
}
