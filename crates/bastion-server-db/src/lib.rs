// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for the Bastion server.
//!
//! Each table group has a `*Store` trait (the seam services depend on) and a
//! `*Repository` implementing it over a shared [`SqlitePool`].

pub mod document;
pub mod error;
pub mod feature_rule;
pub mod migrations;
pub mod pool;
pub mod profile;
mod row;
pub mod session;
pub mod team;
pub mod ticket;
pub mod usage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use document::{DocumentRepository, DocumentStore};
pub use error::{DbError, Result};
pub use feature_rule::{FeatureRuleRepository, FeatureRuleStore};
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use profile::{ProfileRepository, ProfileStore};
pub use session::{AuthSessionRecord, AuthSessionRepository, AuthSessionStore};
pub use team::{TeamRepository, TeamStore};
pub use ticket::{TicketFilter, TicketRepository, TicketScope, TicketStore};
pub use usage::{UsageRepository, UsageStore};

pub use sqlx::SqlitePool;
