// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sign-in, refresh and profile edits for a [`UserSession`], plus the team
//! membership sagas.

use std::sync::Arc;

use bastion_auth_core::{
	resolve_profile, ProfileRecord, ProfileUpdate, TeamId, TeamMembership, TeamRole, UserId,
};
use bastion_server_audit::{AuditEventType, AuditLogEntry, AuditService};
use bastion_server_db::{DbError, ProfileStore, TeamStore};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, SessionError};
use crate::reconcile::ReconcileService;
use crate::user_session::UserSession;

pub struct SessionManager {
	profiles: Arc<dyn ProfileStore>,
	teams: Arc<dyn TeamStore>,
	reconciler: Arc<ReconcileService>,
	audit: Arc<AuditService>,
}

impl SessionManager {
	pub fn new(
		profiles: Arc<dyn ProfileStore>,
		teams: Arc<dyn TeamStore>,
		reconciler: Arc<ReconcileService>,
		audit: Arc<AuditService>,
	) -> Self {
		Self {
			profiles,
			teams,
			reconciler,
			audit,
		}
	}

	/// Builds the session for a freshly authenticated user.
	///
	/// A user seen for the first time gets an empty profile row; resolution
	/// then fills in defaults. A store read failure fails sign-in outright and
	/// no defaults are applied.
	#[instrument(skip(self), fields(user_id = %user_id))]
	pub async fn sign_in(&self, user_id: UserId) -> Result<UserSession> {
		if self.profiles.ensure_profile(&user_id).await? {
			info!("provisioned profile for new user");
		}
		self.load(user_id).await
	}

	/// Re-reads and re-resolves the profile. Also rebuilds the session of a
	/// still-valid sign-in after a restart.
	#[instrument(skip(self), fields(user_id = %user_id))]
	pub async fn refresh(&self, user_id: UserId) -> Result<UserSession> {
		self.load(user_id).await
	}

	async fn load(&self, user_id: UserId) -> Result<UserSession> {
		let stored = self
			.profiles
			.get_profile(&user_id)
			.await?
			.ok_or(SessionError::ProfileMissing(user_id))?;

		let record = ProfileRecord::from(stored);
		let resolution = resolve_profile(&record);

		if !resolution.is_clean() {
			let queued = self.reconciler.submit(&resolution.reconciliations);
			debug!(
				pending = resolution.reconciliations.len(),
				queued, "profile needs reconciliation"
			);
		}

		let team_name = match record.team_id {
			Some(team_id) => self.team_name(&team_id).await,
			None => None,
		};

		Ok(UserSession::new(record, &resolution, team_name))
	}

	/// Display name lookup that never fails the caller.
	async fn team_name(&self, team_id: &TeamId) -> Option<String> {
		match self.teams.get_team(team_id).await {
			Ok(team) => team.map(|t| t.name),
			Err(e) => {
				warn!(team_id = %team_id, error = %e, "could not load team name");
				None
			}
		}
	}

	/// Persists profile edits and refreshes the in-memory copy.
	#[instrument(skip(self, session, update), fields(user_id = %session.user_id))]
	pub async fn update_profile(
		&self,
		session: &mut UserSession,
		update: &ProfileUpdate,
	) -> Result<()> {
		update.validate()?;
		if update.is_empty() {
			return Ok(());
		}

		self.profiles
			.update_profile(&session.user_id, update)
			.await
			.map_err(|e| match e {
				DbError::NotFound(_) => SessionError::ProfileMissing(session.user_id),
				other => SessionError::Store(other),
			})?;

		*session = self.load(session.user_id).await?;

		let fields: Vec<&str> = [
			update.full_name.as_ref().map(|_| "full_name"),
			update.job_title.as_ref().map(|_| "job_title"),
			update.avatar_url.as_ref().map(|_| "avatar_url"),
		]
		.into_iter()
		.flatten()
		.collect();
		self.audit.log(
			AuditLogEntry::builder(AuditEventType::ProfileUpdated)
				.actor(session.user_id)
				.resource("profile", session.user_id.to_string())
				.details(json!({ "fields": fields }))
				.build(),
		);
		Ok(())
	}

	/// Adds the user to a team and points their profile at it.
	///
	/// If the profile write fails the membership insert is undone. A failed
	/// display-name lookup afterwards leaves the join in place.
	#[instrument(skip(self, session), fields(user_id = %session.user_id, team_id = %team_id))]
	pub async fn join_team(&self, session: &mut UserSession, team_id: TeamId) -> Result<()> {
		let user_id = session.user_id;

		if self.teams.get_team(&team_id).await?.is_none() {
			return Err(SessionError::TeamNotFound(team_id));
		}
		if self.teams.get_membership(&team_id, &user_id).await?.is_some() {
			return Err(SessionError::AlreadyMember(team_id));
		}

		let membership = TeamMembership::new(team_id, user_id, TeamRole::Member);
		self.teams.add_member(&membership).await.map_err(|e| match e {
			DbError::Conflict(_) => SessionError::AlreadyMember(team_id),
			other => SessionError::Store(other),
		})?;

		if let Err(e) = self.profiles.set_team(&user_id, Some(&team_id)).await {
			warn!(error = %e, "profile team update failed, removing membership");
			if let Err(undo) = self.teams.remove_member(&team_id, &user_id).await {
				self.compensation_failed("join", user_id, team_id, &e, &undo);
			}
			return Err(e.into());
		}

		session.team_id = Some(team_id);
		session.team_name = self.team_name(&team_id).await;

		self.audit.log(
			AuditLogEntry::builder(AuditEventType::TeamJoined)
				.actor(user_id)
				.resource("team", team_id.to_string())
				.details(json!({ "team_role": membership.role }))
				.build(),
		);
		Ok(())
	}

	/// Removes the user from a team and clears the profile reference if it
	/// points at that team.
	///
	/// If the profile write fails the membership is restored with its
	/// previous team role.
	#[instrument(skip(self, session), fields(user_id = %session.user_id, team_id = %team_id))]
	pub async fn leave_team(&self, session: &mut UserSession, team_id: TeamId) -> Result<()> {
		let user_id = session.user_id;

		let previous = self
			.teams
			.get_membership(&team_id, &user_id)
			.await?
			.ok_or(SessionError::NotMember(team_id))?;

		if !self.teams.remove_member(&team_id, &user_id).await? {
			return Err(SessionError::NotMember(team_id));
		}

		if let Err(e) = self.profiles.clear_team_if(&user_id, &team_id).await {
			warn!(error = %e, "profile team update failed, restoring membership");
			if let Err(undo) = self.teams.add_member(&previous).await {
				self.compensation_failed("leave", user_id, team_id, &e, &undo);
			}
			return Err(e.into());
		}

		if session.team_id == Some(team_id) {
			session.team_id = None;
			session.team_name = None;
		}

		self.audit.log(
			AuditLogEntry::builder(AuditEventType::TeamLeft)
				.actor(user_id)
				.resource("team", team_id.to_string())
				.details(json!({ "team_role": previous.role }))
				.build(),
		);
		Ok(())
	}

	fn compensation_failed(
		&self,
		saga: &'static str,
		user_id: UserId,
		team_id: TeamId,
		cause: &DbError,
		undo: &DbError,
	) {
		error!(
			saga,
			user_id = %user_id,
			team_id = %team_id,
			cause = %cause,
			error = %undo,
			"team membership compensation failed"
		);
		self.audit.log(
			AuditLogEntry::builder(AuditEventType::TeamCompensationFailed)
				.actor(user_id)
				.resource("team", team_id.to_string())
				.details(json!({
					"saga": saga,
					"cause": cause.to_string(),
					"error": undo.to_string(),
				}))
				.build(),
		);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{FlakyProfiles, FlakyTeams, RecordingSink};
	use bastion_auth_core::{Role, StoredProfile, SubscriptionPlan, SubscriptionTier, Team};
	use bastion_common_http::RetryConfig;
	use bastion_server_audit::{AuditFilterConfig, QueueOverflowPolicy};
	use bastion_server_db::testing::{create_test_pool, insert_profile, insert_team};
	use bastion_server_db::{ProfileRepository, SqlitePool, TeamRepository};

	struct Harness {
		pool: SqlitePool,
		profiles: Arc<FlakyProfiles>,
		teams: Arc<FlakyTeams>,
		reconciler: Arc<ReconcileService>,
		audit: Arc<AuditService>,
		sink: Arc<RecordingSink>,
		manager: SessionManager,
	}

	impl Harness {
		async fn new() -> Self {
			let pool = create_test_pool().await;
			let profiles = Arc::new(FlakyProfiles::new(pool.clone()));
			let teams = Arc::new(FlakyTeams::new(pool.clone()));
			let sink = Arc::new(RecordingSink::default());
			let audit = Arc::new(AuditService::new(
				AuditFilterConfig::default(),
				100,
				QueueOverflowPolicy::DropNewest,
				vec![sink.clone()],
			));
			let reconciler = Arc::new(ReconcileService::with_retry(
				profiles.clone(),
				audit.clone(),
				64,
				RetryConfig::immediate(2),
			));
			let manager =
				SessionManager::new(profiles.clone(), teams.clone(), reconciler.clone(), audit.clone());
			Self {
				pool,
				profiles,
				teams,
				reconciler,
				audit,
				sink,
				manager,
			}
		}

		async fn drain(&self) {
			self.reconciler.shutdown().await;
			self.audit.shutdown().await;
		}

		async fn stored(&self, user_id: &UserId) -> StoredProfile {
			ProfileRepository::new(self.pool.clone())
				.get_profile(user_id)
				.await
				.unwrap()
				.unwrap()
		}

		async fn membership(&self, team: &Team, user_id: &UserId) -> Option<TeamMembership> {
			TeamRepository::new(self.pool.clone())
				.get_membership(&team.id, user_id)
				.await
				.unwrap()
		}
	}

	mod sign_in {
		use super::*;

		#[tokio::test]
		async fn first_sign_in_provisions_defaults() {
			let h = Harness::new().await;
			let user_id = UserId::generate();

			let session = h.manager.sign_in(user_id).await.unwrap();
			assert_eq!(session.role(), Role::IndividualBasic);
			assert_eq!(session.tier(), SubscriptionTier::Individual);
			assert_eq!(session.plan(), SubscriptionPlan::Free);

			h.drain().await;
			let stored = h.stored(&user_id).await;
			assert_eq!(stored.role.as_deref(), Some("individual_basic"));
			assert_eq!(stored.subscription_tier.as_deref(), Some("individual"));
			assert_eq!(stored.subscription_plan.as_deref(), Some("free"));
		}

		#[tokio::test]
		async fn legacy_admin_is_translated_once() {
			let h = Harness::new().await;
			let mut stored = StoredProfile::new(UserId::generate());
			stored.role = Some("admin".to_string());
			insert_profile(&h.pool, &stored).await;

			let session = h.manager.sign_in(stored.id).await.unwrap();
			assert_eq!(session.role(), Role::PlatformAdmin);
			h.reconciler.shutdown().await;

			let again = h.manager.sign_in(stored.id).await.unwrap();
			assert_eq!(again.role(), Role::PlatformAdmin);
			h.audit.shutdown().await;

			assert_eq!(h.sink.count(AuditEventType::ProfileReconciled), 3);
		}

		#[tokio::test]
		async fn enterprise_tier_overwrites_stale_plan() {
			let h = Harness::new().await;
			let mut stored = StoredProfile::new(UserId::generate());
			stored.subscription_tier = Some("enterprise".to_string());
			stored.subscription_plan = Some("pro".to_string());
			insert_profile(&h.pool, &stored).await;

			let session = h.manager.sign_in(stored.id).await.unwrap();
			assert_eq!(session.role(), Role::IndividualBasic);
			assert_eq!(session.plan(), SubscriptionPlan::Enterprise);

			h.drain().await;
			let after = h.stored(&stored.id).await;
			assert_eq!(after.role.as_deref(), Some("individual_basic"));
			assert_eq!(after.subscription_plan.as_deref(), Some("enterprise"));
		}

		#[tokio::test]
		async fn reconcile_failure_does_not_fail_sign_in() {
			let h = Harness::new().await;
			h.profiles.fail_reconcile(true);

			let session = h.manager.sign_in(UserId::generate()).await.unwrap();
			assert_eq!(session.role(), Role::IndividualBasic);

			h.drain().await;
			assert_eq!(h.sink.count(AuditEventType::ProfileReconcileFailed), 3);
		}

		#[tokio::test]
		async fn refresh_of_unknown_user_does_not_provision() {
			let h = Harness::new().await;
			let err = h.manager.refresh(UserId::generate()).await.unwrap_err();
			assert!(matches!(err, SessionError::ProfileMissing(_)));
		}

		#[tokio::test]
		async fn team_name_is_loaded() {
			let h = Harness::new().await;
			let team = insert_team(&h.pool, "Blue Cell").await;
			let mut stored = StoredProfile::new(UserId::generate());
			stored.team_id = Some(team.id);
			insert_profile(&h.pool, &stored).await;

			let session = h.manager.sign_in(stored.id).await.unwrap();
			assert_eq!(session.team_name.as_deref(), Some("Blue Cell"));
		}
	}

	mod profile {
		use super::*;

		#[tokio::test]
		async fn update_refreshes_session() {
			let h = Harness::new().await;
			let mut session = h.manager.sign_in(UserId::generate()).await.unwrap();

			let update = ProfileUpdate {
				full_name: Some("Grace Hunter".to_string()),
				job_title: Some("Threat Hunter".to_string()),
				..Default::default()
			};
			h.manager.update_profile(&mut session, &update).await.unwrap();
			assert_eq!(session.full_name.as_deref(), Some("Grace Hunter"));
			assert_eq!(session.job_title.as_deref(), Some("Threat Hunter"));

			h.drain().await;
			let updates = h.sink.entries_of(AuditEventType::ProfileUpdated);
			assert_eq!(updates[0].details["fields"], json!(["full_name", "job_title"]));
		}

		#[tokio::test]
		async fn invalid_update_is_rejected() {
			let h = Harness::new().await;
			let mut session = h.manager.sign_in(UserId::generate()).await.unwrap();
			let update = ProfileUpdate {
				avatar_url: Some("ftp://example.com/me.png".to_string()),
				..Default::default()
			};
			let err = h.manager.update_profile(&mut session, &update).await.unwrap_err();
			assert!(matches!(err, SessionError::Validation(_)));
		}
	}

	mod teams {
		use super::*;

		#[tokio::test]
		async fn join_then_leave() {
			let h = Harness::new().await;
			let team = insert_team(&h.pool, "Red Cell").await;
			let mut session = h.manager.sign_in(UserId::generate()).await.unwrap();

			h.manager.join_team(&mut session, team.id).await.unwrap();
			assert_eq!(session.team_id, Some(team.id));
			assert_eq!(session.team_name.as_deref(), Some("Red Cell"));
			assert_eq!(h.stored(&session.user_id).await.team_id, Some(team.id));
			assert_eq!(
				h.membership(&team, &session.user_id).await.map(|m| m.role),
				Some(TeamRole::Member)
			);

			h.manager.leave_team(&mut session, team.id).await.unwrap();
			assert_eq!(session.team_id, None);
			assert_eq!(session.team_name, None);
			assert_eq!(h.stored(&session.user_id).await.team_id, None);
			assert!(h.membership(&team, &session.user_id).await.is_none());

			h.drain().await;
			assert_eq!(h.sink.count(AuditEventType::TeamJoined), 1);
			assert_eq!(h.sink.count(AuditEventType::TeamLeft), 1);
		}

		#[tokio::test]
		async fn joining_twice_conflicts() {
			let h = Harness::new().await;
			let team = insert_team(&h.pool, "Blue Cell").await;
			let mut session = h.manager.sign_in(UserId::generate()).await.unwrap();

			h.manager.join_team(&mut session, team.id).await.unwrap();
			let err = h.manager.join_team(&mut session, team.id).await.unwrap_err();
			assert!(matches!(err, SessionError::AlreadyMember(id) if id == team.id));
		}

		#[tokio::test]
		async fn unknown_team_and_non_member() {
			let h = Harness::new().await;
			let mut session = h.manager.sign_in(UserId::generate()).await.unwrap();
			let missing = TeamId::generate();

			assert!(matches!(
				h.manager.join_team(&mut session, missing).await,
				Err(SessionError::TeamNotFound(_))
			));
			assert!(matches!(
				h.manager.leave_team(&mut session, missing).await,
				Err(SessionError::NotMember(_))
			));
		}

		#[tokio::test]
		async fn failed_profile_write_undoes_join() {
			let h = Harness::new().await;
			let team = insert_team(&h.pool, "Purple Cell").await;
			let mut session = h.manager.sign_in(UserId::generate()).await.unwrap();
			h.profiles.fail_team_updates(true);

			let err = h.manager.join_team(&mut session, team.id).await.unwrap_err();
			assert!(matches!(err, SessionError::Store(_)));
			assert!(h.membership(&team, &session.user_id).await.is_none());
			assert_eq!(session.team_id, None);
		}

		#[tokio::test]
		async fn failed_profile_write_restores_membership_role() {
			let h = Harness::new().await;
			let team = insert_team(&h.pool, "Blue Cell").await;
			let mut session = h.manager.sign_in(UserId::generate()).await.unwrap();
			TeamRepository::new(h.pool.clone())
				.add_member(&TeamMembership::new(team.id, session.user_id, TeamRole::Lead))
				.await
				.unwrap();
			h.profiles.fail_team_updates(true);

			let err = h.manager.leave_team(&mut session, team.id).await.unwrap_err();
			assert!(matches!(err, SessionError::Store(_)));
			assert_eq!(
				h.membership(&team, &session.user_id).await.map(|m| m.role),
				Some(TeamRole::Lead)
			);
		}

		#[tokio::test]
		async fn failed_join_compensation_is_audited() {
			let h = Harness::new().await;
			let team = insert_team(&h.pool, "Gold Cell").await;
			let mut session = h.manager.sign_in(UserId::generate()).await.unwrap();
			h.profiles.fail_team_updates(true);
			h.teams.fail_remove_member(true);

			let err = h.manager.join_team(&mut session, team.id).await.unwrap_err();
			assert!(matches!(err, SessionError::Store(DbError::Internal(_))));
			// The dangling membership stays behind for an operator to clean up.
			assert!(h.membership(&team, &session.user_id).await.is_some());

			h.drain().await;
			let failures = h.sink.entries_of(AuditEventType::TeamCompensationFailed);
			assert_eq!(failures.len(), 1);
			assert_eq!(failures[0].details["saga"], "join");
			assert_eq!(h.sink.count(AuditEventType::TeamJoined), 0);
		}

		#[tokio::test]
		async fn failed_leave_compensation_is_audited() {
			let h = Harness::new().await;
			let team = insert_team(&h.pool, "Silver Cell").await;
			let mut session = h.manager.sign_in(UserId::generate()).await.unwrap();
			h.manager.join_team(&mut session, team.id).await.unwrap();
			h.profiles.fail_team_updates(true);
			h.teams.fail_add_member(true);

			let err = h.manager.leave_team(&mut session, team.id).await.unwrap_err();
			assert!(matches!(err, SessionError::Store(_)));
			assert_eq!(session.team_id, Some(team.id));

			h.drain().await;
			let failures = h.sink.entries_of(AuditEventType::TeamCompensationFailed);
			assert_eq!(failures.len(), 1);
			assert_eq!(failures[0].details["saga"], "leave");
		}

		#[tokio::test]
		async fn team_lookup_failure_fails_join_but_not_sign_in() {
			let h = Harness::new().await;
			let team = insert_team(&h.pool, "Green Cell").await;
			let mut stored = StoredProfile::new(UserId::generate());
			stored.team_id = Some(team.id);
			insert_profile(&h.pool, &stored).await;
			h.teams.fail_get_team(true);

			let mut session = h.manager.sign_in(stored.id).await.unwrap();
			assert_eq!(session.team_id, Some(team.id));
			assert_eq!(session.team_name, None);

			let other = insert_team(&h.pool, "Other Cell").await;
			let err = h.manager.join_team(&mut session, other.id).await.unwrap_err();
			assert!(matches!(err, SessionError::Store(_)));
		}
	}
}
