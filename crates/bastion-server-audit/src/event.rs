// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core event types for audit logging.
//!
//! - [`AuditEventType`]: every auditable event
//! - [`AuditSeverity`]: RFC 5424-compatible severity levels
//! - [`AuditLogEntry`]: a complete audit record
//! - [`AuditLogBuilder`]: fluent construction of entries

use bastion_auth_core::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AuditError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
	// Authentication
	SignIn,
	SignInFailed,
	SignOut,
	SessionRefreshed,

	// Profile
	ProfileUpdated,
	ProfileReconciled,
	ProfileReconcileFailed,

	// Access control
	AccessDenied,
	FeatureDenied,

	// Teams
	TeamJoined,
	TeamLeft,
	TeamCompensationFailed,

	// Tickets
	TicketCreated,
	TicketUpdated,

	// Documents
	DocumentCreated,
	DocumentUpdated,
	DocumentReclassified,
	DocumentDeleted,

	// AI suggestions
	SuggestionRequested,
	SuggestionFailed,
	RateLimited,
	ContentPolicyViolation,
}

impl AuditEventType {
	pub fn as_str(&self) -> &'static str {
		match self {
			AuditEventType::SignIn => "sign_in",
			AuditEventType::SignInFailed => "sign_in_failed",
			AuditEventType::SignOut => "sign_out",
			AuditEventType::SessionRefreshed => "session_refreshed",
			AuditEventType::ProfileUpdated => "profile_updated",
			AuditEventType::ProfileReconciled => "profile_reconciled",
			AuditEventType::ProfileReconcileFailed => "profile_reconcile_failed",
			AuditEventType::AccessDenied => "access_denied",
			AuditEventType::FeatureDenied => "feature_denied",
			AuditEventType::TeamJoined => "team_joined",
			AuditEventType::TeamLeft => "team_left",
			AuditEventType::TeamCompensationFailed => "team_compensation_failed",
			AuditEventType::TicketCreated => "ticket_created",
			AuditEventType::TicketUpdated => "ticket_updated",
			AuditEventType::DocumentCreated => "document_created",
			AuditEventType::DocumentUpdated => "document_updated",
			AuditEventType::DocumentReclassified => "document_reclassified",
			AuditEventType::DocumentDeleted => "document_deleted",
			AuditEventType::SuggestionRequested => "suggestion_requested",
			AuditEventType::SuggestionFailed => "suggestion_failed",
			AuditEventType::RateLimited => "rate_limited",
			AuditEventType::ContentPolicyViolation => "content_policy_violation",
		}
	}

	/// Default severity for this event type.
	///
	/// - `Info`: normal operations
	/// - `Notice`: changes to access or classification, deletions
	/// - `Warning`: refused requests
	/// - `Error`: failed background work and failed compensation
	pub fn default_severity(&self) -> AuditSeverity {
		match self {
			AuditEventType::SignIn
			| AuditEventType::SignOut
			| AuditEventType::SessionRefreshed
			| AuditEventType::ProfileUpdated
			| AuditEventType::ProfileReconciled
			| AuditEventType::TicketCreated
			| AuditEventType::TicketUpdated
			| AuditEventType::DocumentCreated
			| AuditEventType::DocumentUpdated
			| AuditEventType::SuggestionRequested => AuditSeverity::Info,

			AuditEventType::TeamJoined
			| AuditEventType::TeamLeft
			| AuditEventType::DocumentReclassified
			| AuditEventType::DocumentDeleted => AuditSeverity::Notice,

			AuditEventType::SignInFailed
			| AuditEventType::AccessDenied
			| AuditEventType::FeatureDenied
			| AuditEventType::RateLimited
			| AuditEventType::ContentPolicyViolation => AuditSeverity::Warning,

			AuditEventType::ProfileReconcileFailed
			| AuditEventType::TeamCompensationFailed
			| AuditEventType::SuggestionFailed => AuditSeverity::Error,
		}
	}
}

impl fmt::Display for AuditEventType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Severity levels for audit events, compatible with RFC 5424 syslog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
	Debug = 7,
	#[default]
	Info = 6,
	Notice = 5,
	Warning = 4,
	Error = 3,
	Critical = 2,
}

impl AuditSeverity {
	/// Returns the RFC 5424 numeric severity code.
	pub fn as_syslog_code(&self) -> u8 {
		*self as u8
	}

	/// Returns all severity levels from most to least severe.
	pub fn all() -> &'static [AuditSeverity] {
		&[
			AuditSeverity::Critical,
			AuditSeverity::Error,
			AuditSeverity::Warning,
			AuditSeverity::Notice,
			AuditSeverity::Info,
			AuditSeverity::Debug,
		]
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			AuditSeverity::Debug => "debug",
			AuditSeverity::Info => "info",
			AuditSeverity::Notice => "notice",
			AuditSeverity::Warning => "warning",
			AuditSeverity::Error => "error",
			AuditSeverity::Critical => "critical",
		}
	}
}

impl PartialOrd for AuditSeverity {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for AuditSeverity {
	fn cmp(&self, other: &Self) -> Ordering {
		// Lower numeric value = higher severity (Critical=2 > Debug=7)
		(*other as u8).cmp(&(*self as u8))
	}
}

impl fmt::Display for AuditSeverity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AuditSeverity {
	type Err = AuditError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"debug" => Ok(AuditSeverity::Debug),
			"info" => Ok(AuditSeverity::Info),
			"notice" => Ok(AuditSeverity::Notice),
			"warning" | "warn" => Ok(AuditSeverity::Warning),
			"error" => Ok(AuditSeverity::Error),
			"critical" => Ok(AuditSeverity::Critical),
			other => Err(AuditError::ConfigError(format!(
				"unknown audit severity '{other}'"
			))),
		}
	}
}

/// An entry in the audit log recording a security-relevant event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
	pub id: Uuid,
	pub timestamp: DateTime<Utc>,
	pub event_type: AuditEventType,
	pub severity: AuditSeverity,

	/// The user who performed the action (if known).
	pub actor_user_id: Option<UserId>,

	/// The type of resource affected (e.g., "ticket", "document", "team").
	pub resource_type: Option<String>,
	pub resource_id: Option<String>,

	/// Human-readable description of the action.
	pub action: String,
	pub ip_address: Option<String>,
	pub user_agent: Option<String>,
	/// Additional event-specific details.
	pub details: serde_json::Value,
	/// Application-level request ID for correlation.
	pub request_id: Option<String>,
}

impl AuditLogEntry {
	pub fn builder(event_type: AuditEventType) -> AuditLogBuilder {
		AuditLogBuilder::new(event_type)
	}
}

#[derive(Debug, Clone)]
pub struct AuditLogBuilder {
	event_type: AuditEventType,
	severity: Option<AuditSeverity>,
	actor_user_id: Option<UserId>,
	resource_type: Option<String>,
	resource_id: Option<String>,
	action: Option<String>,
	ip_address: Option<String>,
	user_agent: Option<String>,
	details: serde_json::Value,
	request_id: Option<String>,
}

impl AuditLogBuilder {
	pub fn new(event_type: AuditEventType) -> Self {
		Self {
			event_type,
			severity: None,
			actor_user_id: None,
			resource_type: None,
			resource_id: None,
			action: None,
			ip_address: None,
			user_agent: None,
			details: serde_json::Value::Null,
			request_id: None,
		}
	}

	/// Set the severity level. Defaults to the event type's default severity.
	pub fn severity(mut self, severity: AuditSeverity) -> Self {
		self.severity = Some(severity);
		self
	}

	pub fn actor(mut self, user_id: UserId) -> Self {
		self.actor_user_id = Some(user_id);
		self
	}

	pub fn resource(
		mut self,
		resource_type: impl Into<String>,
		resource_id: impl Into<String>,
	) -> Self {
		self.resource_type = Some(resource_type.into());
		self.resource_id = Some(resource_id.into());
		self
	}

	pub fn action(mut self, action: impl Into<String>) -> Self {
		self.action = Some(action.into());
		self
	}

	pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
		self.ip_address = Some(ip.into());
		self
	}

	pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
		self.user_agent = Some(ua.into());
		self
	}

	pub fn details(mut self, details: serde_json::Value) -> Self {
		self.details = details;
		self
	}

	pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
		self.request_id = Some(request_id.into());
		self
	}

	pub fn build(self) -> AuditLogEntry {
		AuditLogEntry {
			id: Uuid::new_v4(),
			timestamp: Utc::now(),
			event_type: self.event_type,
			severity: self
				.severity
				.unwrap_or_else(|| self.event_type.default_severity()),
			actor_user_id: self.actor_user_id,
			resource_type: self.resource_type,
			resource_id: self.resource_id,
			action: self.action.unwrap_or_else(|| self.event_type.to_string()),
			ip_address: self.ip_address,
			user_agent: self.user_agent,
			details: self.details,
			request_id: self.request_id,
		}
	}
}
