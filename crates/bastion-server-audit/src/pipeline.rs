// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::{Arc, Mutex};

use bastion_server_config::{AuditConfig, QueueOverflowPolicy};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use crate::error::{AuditError, AuditResult};
use crate::event::AuditLogEntry;
use crate::filter::AuditFilterConfig;
use crate::redaction::redact_entry;
use crate::sink::AuditSink;

/// Queues audit entries and fans them out to sinks from a background task.
///
/// Callers never wait on a sink. Entries are filtered, then redacted, then
/// handed to every sink whose own filter accepts them. A failing sink is
/// logged and skipped.
pub struct AuditService {
	tx: Mutex<Option<mpsc::Sender<AuditLogEntry>>>,
	worker: Mutex<Option<JoinHandle<()>>>,
	overflow_policy: QueueOverflowPolicy,
	sinks: Vec<Arc<dyn AuditSink>>,
}

impl AuditService {
	pub fn new(
		global_filter: AuditFilterConfig,
		queue_capacity: usize,
		overflow_policy: QueueOverflowPolicy,
		sinks: Vec<Arc<dyn AuditSink>>,
	) -> Self {
		let (tx, rx) = mpsc::channel(queue_capacity.max(1));

		let worker = tokio::spawn(Self::background_task(rx, global_filter, sinks.clone()));

		Self {
			tx: Mutex::new(Some(tx)),
			worker: Mutex::new(Some(worker)),
			overflow_policy,
			sinks,
		}
	}

	/// Builds the service described by the `[audit]` section. A disabled
	/// section yields [`AuditService::disabled`].
	pub fn from_config(config: &AuditConfig, sinks: Vec<Arc<dyn AuditSink>>) -> AuditResult<Self> {
		if !config.enabled {
			return Ok(Self::disabled());
		}
		let filter = AuditFilterConfig::from_config(config)?;
		Ok(Self::new(
			filter,
			config.queue_capacity,
			config.queue_overflow_policy,
			sinks,
		))
	}

	/// A service that accepts nothing.
	pub fn disabled() -> Self {
		Self {
			tx: Mutex::new(None),
			worker: Mutex::new(None),
			overflow_policy: QueueOverflowPolicy::DropNewest,
			sinks: Vec::new(),
		}
	}

	async fn background_task(
		mut rx: mpsc::Receiver<AuditLogEntry>,
		global_filter: AuditFilterConfig,
		sinks: Vec<Arc<dyn AuditSink>>,
	) {
		while let Some(mut entry) = rx.recv().await {
			if !global_filter.allows(&entry) {
				continue;
			}

			redact_entry(&mut entry);
			let entry = Arc::new(entry);

			for sink in &sinks {
				if !sink.filter().allows(&entry) {
					continue;
				}
				if let Err(e) = sink.publish(Arc::clone(&entry)).await {
					warn!(sink = sink.name(), error = %e, "audit sink publish failed");
				}
			}
		}
		debug!("audit queue closed");
	}

	fn sender(&self) -> Option<mpsc::Sender<AuditLogEntry>> {
		self.tx
			.lock()
			.unwrap_or_else(|poisoned| poisoned.into_inner())
			.clone()
	}

	/// Queues an entry. Returns `false` if it was dropped.
	///
	/// With `DropNewest` a full queue drops the entry. With `Block` the send
	/// happens on a spawned task so the caller still does not wait.
	#[instrument(skip(self, entry), fields(event_type = %entry.event_type))]
	pub fn log(&self, entry: AuditLogEntry) -> bool {
		let Some(tx) = self.sender() else {
			return false;
		};
		match self.overflow_policy {
			QueueOverflowPolicy::Block => {
				tokio::spawn(async move {
					let _ = tx.send(entry).await;
				});
				true
			}
			QueueOverflowPolicy::DropNewest => match tx.try_send(entry) {
				Ok(()) => true,
				Err(mpsc::error::TrySendError::Full(_)) => {
					warn!("audit queue full, dropping entry");
					false
				}
				Err(mpsc::error::TrySendError::Closed(_)) => false,
			},
		}
	}

	/// Queues an entry, waiting for queue space.
	pub async fn log_blocking(&self, entry: AuditLogEntry) -> AuditResult<()> {
		let tx = self.sender().ok_or(AuditError::Shutdown)?;
		tx.send(entry).await.map_err(|_| AuditError::Shutdown)
	}

	/// Checks every sink, failing on the first unhealthy one.
	pub async fn health_check(&self) -> AuditResult<()> {
		for sink in &self.sinks {
			sink.health_check()
				.await
				.map_err(|source| AuditError::SinkError {
					sink: sink.name().to_string(),
					source,
				})?;
		}
		Ok(())
	}

	/// Stops accepting entries and waits until everything already queued
	/// has been published.
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
				warn!(error = %e, "audit worker ended abnormally");
			}
		}
	}
}
