// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections for bastion-server.

pub mod audit;
pub mod auth;
pub mod completion;
pub mod database;
pub mod http;
pub mod logging;
pub mod reconcile;
pub mod usage;

pub use audit::{AuditConfig, AuditConfigLayer, QueueOverflowPolicy};
pub use auth::{AuthConfig, AuthConfigLayer};
pub use completion::{CompletionConfig, CompletionConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
pub use reconcile::{ReconcileConfig, ReconcileConfigLayer};
pub use usage::{UsageConfig, UsageConfigLayer};
