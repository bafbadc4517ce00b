// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The signed-in user's view of Bastion.
//!
//! [`SessionManager`] turns a stored profile into a [`UserSession`] with a
//! fully resolved role and subscription, hands any write-backs to the
//! [`ReconcileService`], and runs the team membership sagas. [`FeatureGate`]
//! answers tier-based feature questions.

pub mod error;
pub mod features;
pub mod manager;
pub mod reconcile;
pub mod user_session;

#[cfg(test)]
mod testing;

pub use error::{Result, SessionError};
pub use features::{DecisionSource, FeatureDecision, FeatureGate};
pub use manager::SessionManager;
pub use reconcile::ReconcileService;
pub use user_session::{session_has_permissions, UserSession};
