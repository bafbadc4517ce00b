// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory user sessions, keyed by sign-in.

use std::collections::HashMap;
use std::sync::Arc;

use bastion_auth_core::{AuthSessionId, UserId};
use bastion_server_session::UserSession;
use tokio::sync::RwLock;

pub type SharedSession = Arc<RwLock<UserSession>>;

#[derive(Clone, Default)]
pub struct SessionRegistry {
	inner: Arc<RwLock<HashMap<AuthSessionId, SharedSession>>>,
}

impl SessionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn insert(&self, id: AuthSessionId, session: UserSession) -> SharedSession {
		let shared = Arc::new(RwLock::new(session));
		self.inner.write().await.insert(id, Arc::clone(&shared));
		shared
	}

	pub async fn get(&self, id: &AuthSessionId) -> Option<SharedSession> {
		self.inner.read().await.get(id).cloned()
	}

	pub async fn remove(&self, id: &AuthSessionId) -> Option<SharedSession> {
		self.inner.write().await.remove(id)
	}

	/// Evicts every listed sign-in, returning how many were present.
	pub async fn remove_all(&self, ids: &[AuthSessionId]) -> usize {
		let mut inner = self.inner.write().await;
		ids.iter().filter(|id| inner.remove(*id).is_some()).count()
	}

	/// Sessions of one user across all their sign-ins.
	pub async fn for_user(&self, user_id: &UserId) -> Vec<SharedSession> {
		let sessions: Vec<SharedSession> = self.inner.read().await.values().cloned().collect();
		let mut matching = Vec::new();
		for session in sessions {
			if session.read().await.user_id == *user_id {
				matching.push(session);
			}
		}
		matching
	}

	pub async fn len(&self) -> usize {
		self.inner.read().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.inner.read().await.is_empty()
	}
}
