// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use bastion_auth_core::{StoredProfile, Team, UserId};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::migrations::run_migrations;
use crate::profile::ProfileRepository;
use crate::team::TeamRepository;

/// In-memory database with the full schema. A single connection keeps every
/// query on the same in-memory database.
pub async fn create_test_pool() -> SqlitePool {
	let options = SqliteConnectOptions::from_str(":memory:")
		.unwrap()
		.foreign_keys(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(1)
		.connect_with(options)
		.await
		.expect("Failed to create test pool");

	run_migrations(&pool).await.expect("Failed to run migrations");
	pool
}

pub async fn insert_profile(pool: &SqlitePool, profile: &StoredProfile) {
	ProfileRepository::new(pool.clone())
		.create_profile(profile)
		.await
		.expect("Failed to insert profile");
}

pub async fn insert_user(pool: &SqlitePool) -> UserId {
	let user_id = UserId::generate();
	insert_profile(pool, &StoredProfile::new(user_id)).await;
	user_id
}

pub async fn insert_team(pool: &SqlitePool, name: &str) -> Team {
	let team = Team::new(name, None);
	TeamRepository::new(pool.clone())
		.create_team(&team)
		.await
		.expect("Failed to insert team");
	team
}
