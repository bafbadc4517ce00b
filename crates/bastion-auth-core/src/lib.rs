// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Domain model for Bastion access control.
//!
//! Everything in this crate is pure: static role and permission tables, the
//! subscription tier/plan mapping, tier deny rules for feature flags and the
//! profile resolution that turns a stored (possibly legacy) profile into a
//! resolved role/tier/plan triple plus the writes needed to bring the store
//! up to date. Storage and I/O live in `bastion-server-db` and
//! `bastion-server-session`.

pub mod document;
pub mod error;
pub mod features;
pub mod notice;
pub mod permissions;
pub mod profile;
pub mod resolve;
pub mod role;
pub mod subscription;
pub mod team;
pub mod ticket;
pub mod types;

pub use document::{Document, DocumentDraft, DocumentPatch, Sensitivity};
pub use error::{ParseEnumError, ValidationError};
pub use features::{static_decision, tier_fallback, StaticDecision};
pub use notice::Notice;
pub use permissions::{has_permission_keys, has_permissions, Permission};
pub use profile::{ProfileRecord, ProfileUpdate, StoredProfile};
pub use resolve::{
	resolve_profile, ReconcileField, ReconcileReason, Reconciliation, Resolution, ResolvedProfile,
};
pub use role::{BasicRole, LegacyRole, Role, StoredRole};
pub use subscription::{SubscriptionPlan, SubscriptionTier};
pub use team::{Team, TeamMembership, TeamRole};
pub use ticket::{
	ActivityAction, Ticket, TicketActivity, TicketDraft, TicketPatch, TicketPriority, TicketStatus,
};
pub use types::{ActivityId, AuthSessionId, DocumentId, TeamId, TicketId, UserId};
