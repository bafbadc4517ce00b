// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Level;

use super::{AuditSink, AuditSinkError};
use crate::event::{AuditLogEntry, AuditSeverity};
use crate::filter::AuditFilterConfig;

/// Emits each entry as a structured event on the `bastion_audit` target.
pub struct TracingAuditSink {
	filter: AuditFilterConfig,
}

impl TracingAuditSink {
	pub fn new(filter: AuditFilterConfig) -> Self {
		Self { filter }
	}
}

pub fn severity_to_level(severity: AuditSeverity) -> Level {
	match severity {
		AuditSeverity::Debug => Level::DEBUG,
		AuditSeverity::Info | AuditSeverity::Notice => Level::INFO,
		AuditSeverity::Warning => Level::WARN,
		AuditSeverity::Error | AuditSeverity::Critical => Level::ERROR,
	}
}

macro_rules! emit {
	($macro:ident, $entry:expr) => {{
		let entry: &AuditLogEntry = $entry;
		let details = if entry.details.is_null() {
			None
		} else {
			Some(entry.details.to_string())
		};
		tracing::$macro!(
			target: "bastion_audit",
			event_type = entry.event_type.as_str(),
			severity = entry.severity.as_str(),
			id = %entry.id,
			timestamp = %entry.timestamp.to_rfc3339(),
			action = entry.action.as_str(),
			actor_user_id = entry.actor_user_id.map(|u| u.to_string()),
			resource_type = entry.resource_type.as_deref(),
			resource_id = entry.resource_id.as_deref(),
			ip_address = entry.ip_address.as_deref(),
			user_agent = entry.user_agent.as_deref(),
			request_id = entry.request_id.as_deref(),
			details,
			"audit event"
		);
	}};
}

#[async_trait]
impl AuditSink for TracingAuditSink {
	fn name(&self) -> &str {
		"tracing"
	}

	fn filter(&self) -> &AuditFilterConfig {
		&self.filter
	}

	async fn publish(&self, entry: Arc<AuditLogEntry>) -> Result<(), AuditSinkError> {
		match severity_to_level(entry.severity) {
			Level::DEBUG => emit!(debug, &entry),
			Level::INFO => emit!(info, &entry),
			Level::WARN => emit!(warn, &entry),
			_ => emit!(error, &entry),
		}
		Ok(())
	}
}
