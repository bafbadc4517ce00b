// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authentication configuration: identity assertion secret and session lifetime.

use bastion_common_secret::SecretString;
use serde::Deserialize;

const DEFAULT_SESSION_EXPIRY_DAYS: i64 = 30;
const DEFAULT_ENVIRONMENT: &str = "development";

#[derive(Debug, Clone)]
pub struct AuthConfig {
	/// Shared HMAC key used to verify identity assertions from the auth provider.
	pub identity_secret: Option<SecretString>,
	pub session_expiry_days: i64,
	pub environment: String,
}

impl AuthConfig {
	pub fn is_production(&self) -> bool {
		self.environment.eq_ignore_ascii_case("production")
	}
}

impl Default for AuthConfig {
	fn default() -> Self {
		AuthConfigLayer::default().finalize()
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfigLayer {
	#[serde(default)]
	pub identity_secret: Option<SecretString>,
	#[serde(default)]
	pub session_expiry_days: Option<i64>,
	#[serde(default)]
	pub environment: Option<String>,
}

impl AuthConfigLayer {
	pub fn merge(&mut self, other: AuthConfigLayer) {
		if other.identity_secret.is_some() {
			self.identity_secret = other.identity_secret;
		}
		if other.session_expiry_days.is_some() {
			self.session_expiry_days = other.session_expiry_days;
		}
		if other.environment.is_some() {
			self.environment = other.environment;
		}
	}

	pub fn finalize(self) -> AuthConfig {
		AuthConfig {
			identity_secret: self.identity_secret.filter(|s| !s.is_blank()),
			session_expiry_days: self
				.session_expiry_days
				.filter(|d| *d > 0)
				.unwrap_or(DEFAULT_SESSION_EXPIRY_DAYS),
			environment: self
				.environment
				.unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
		}
	}
}
