// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Background write-back of profile reconciliations.
//!
//! Sign-in never waits on these writes. Each one is retried with backoff;
//! a write that still fails is logged, audited and dropped. The next
//! sign-in resolves the same record again and resubmits it.

use std::sync::{Arc, Mutex};

use bastion_auth_core::Reconciliation;
use bastion_common_http::{retry, RetryConfig};
use bastion_server_audit::{AuditEventType, AuditLogEntry, AuditService};
use bastion_server_config::ReconcileConfig;
use bastion_server_db::ProfileStore;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct ReconcileService {
	tx: Mutex<Option<mpsc::Sender<Reconciliation>>>,
	worker: Mutex<Option<JoinHandle<()>>>,
}

impl ReconcileService {
	pub fn new(
		store: Arc<dyn ProfileStore>,
		audit: Arc<AuditService>,
		config: &ReconcileConfig,
	) -> Self {
		let retry_config = RetryConfig::new(config.max_attempts, config.base_delay, config.max_delay);
		Self::with_retry(store, audit, config.queue_capacity, retry_config)
	}

	pub fn with_retry(
		store: Arc<dyn ProfileStore>,
		audit: Arc<AuditService>,
		queue_capacity: usize,
		retry_config: RetryConfig,
	) -> Self {
		let (tx, rx) = mpsc::channel(queue_capacity.max(1));
		let worker = tokio::spawn(Self::run(rx, store, audit, retry_config));
		Self {
			tx: Mutex::new(Some(tx)),
			worker: Mutex::new(Some(worker)),
		}
	}

	async fn run(
		mut rx: mpsc::Receiver<Reconciliation>,
		store: Arc<dyn ProfileStore>,
		audit: Arc<AuditService>,
		retry_config: RetryConfig,
	) {
		while let Some(item) = rx.recv().await {
			let details = json!({
				"field": item.field.column(),
				"value": item.field.value(),
				"reason": item.reason.as_str(),
			});

			match retry(&retry_config, || store.apply_reconciliation(&item)).await {
				Ok(()) => {
					debug!(
						user_id = %item.user_id,
						field = item.field.column(),
						value = item.field.value(),
						"profile reconciled"
					);
					audit.log(
						AuditLogEntry::builder(AuditEventType::ProfileReconciled)
							.actor(item.user_id)
							.resource("profile", item.user_id.to_string())
							.details(details)
							.build(),
					);
				}
				Err(e) => {
					warn!(
						user_id = %item.user_id,
						field = item.field.column(),
						error = %e,
						"profile reconciliation failed"
					);
					let mut details = details;
					details["error"] = json!(e.to_string());
					audit.log(
						AuditLogEntry::builder(AuditEventType::ProfileReconcileFailed)
							.actor(item.user_id)
							.resource("profile", item.user_id.to_string())
							.details(details)
							.build(),
					);
				}
			}
		}
		debug!("reconcile queue closed");
	}

	/// Queues writes without waiting. Returns how many were accepted.
	pub fn submit(&self, items: &[Reconciliation]) -> usize {
		let tx = self
			.tx
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.clone();
		let Some(tx) = tx else {
			warn!(dropped = items.len(), "reconcile service stopped, dropping writes");
			return 0;
		};

		let mut accepted = 0;
		for item in items {
			match tx.try_send(*item) {
				Ok(()) => accepted += 1,
				Err(e) => {
					warn!(user_id = %item.user_id, field = item.field.column(), error = %e, "reconcile queue rejected write");
				}
			}
		}
		accepted
	}

	/// Stops accepting writes and waits for queued ones to finish.
	pub async fn shutdown(&self) {
		drop(
			self.tx
				.lock()
				.unwrap_or_else(|poisoned| poisoned.into_inner())
				.take(),
		);
		let worker = self
			.worker
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.take();
		if let Some(worker) = worker {
			if let Err(e) = worker.await {
				warn!(error = %e, "reconcile worker ended abnormally");
			}
		}
	}
}
