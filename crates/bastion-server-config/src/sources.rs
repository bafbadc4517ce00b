// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, TOML files and the environment.

use std::path::PathBuf;
use std::str::FromStr;

use tracing::{debug, trace};

use crate::env::load_secret_env;
use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AuditConfigLayer, AuthConfigLayer, CompletionConfigLayer, DatabaseConfigLayer,
	HttpConfigLayer, LogFormat, LoggingConfigLayer, QueueOverflowPolicy, ReconcileConfigLayer,
	UsageConfigLayer,
};

/// Source precedence levels (higher overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer::default())
	}
}

pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/bastion/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		let content = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::FileRead {
			path: self.path.clone(),
			source,
		})?;
		let layer = toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
			path: self.path.clone(),
			source,
		})?;

		trace!(path = %self.path.display(), "parsed config file");
		Ok(layer)
	}
}

/// Environment variables, named `BASTION_SERVER_<SECTION>_<FIELD>`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		Ok(ServerConfigLayer {
			http: Some(HttpConfigLayer {
				host: env_var("BASTION_SERVER_HOST"),
				port: env_parse("BASTION_SERVER_PORT")?,
			}),
			database: Some(DatabaseConfigLayer {
				url: env_var("BASTION_SERVER_DATABASE_URL"),
			}),
			auth: Some(AuthConfigLayer {
				identity_secret: load_secret_env("BASTION_SERVER_IDENTITY_SECRET")?,
				session_expiry_days: env_parse("BASTION_SERVER_SESSION_EXPIRY_DAYS")?,
				environment: env_var("BASTION_SERVER_ENV"),
			}),
			completion: Some(CompletionConfigLayer {
				base_url: env_var("BASTION_SERVER_COMPLETION_BASE_URL"),
				api_key: load_secret_env("BASTION_SERVER_COMPLETION_API_KEY")?,
				model: env_var("BASTION_SERVER_COMPLETION_MODEL"),
				temperature: env_parse("BASTION_SERVER_COMPLETION_TEMPERATURE")?,
				max_tokens: env_parse("BASTION_SERVER_COMPLETION_MAX_TOKENS")?,
				system_prompt: env_var("BASTION_SERVER_COMPLETION_SYSTEM_PROMPT"),
				timeout_secs: env_parse("BASTION_SERVER_COMPLETION_TIMEOUT_SECS")?,
			}),
			usage: Some(UsageConfigLayer {
				daily_suggestion_limit: env_parse("BASTION_SERVER_DAILY_SUGGESTION_LIMIT")?,
			}),
			reconcile: Some(ReconcileConfigLayer {
				queue_capacity: env_parse("BASTION_SERVER_RECONCILE_QUEUE_CAPACITY")?,
				max_attempts: env_parse("BASTION_SERVER_RECONCILE_MAX_ATTEMPTS")?,
				base_delay_ms: env_parse("BASTION_SERVER_RECONCILE_BASE_DELAY_MS")?,
				max_delay_ms: env_parse("BASTION_SERVER_RECONCILE_MAX_DELAY_MS")?,
			}),
			logging: Some(LoggingConfigLayer {
				level: env_var("BASTION_SERVER_LOG_LEVEL"),
				format: env_var("BASTION_SERVER_LOG_FORMAT")
					.map(|v| {
						LogFormat::parse(&v).ok_or_else(|| ConfigError::InvalidValue {
							key: "BASTION_SERVER_LOG_FORMAT".to_string(),
							message: format!("expected 'pretty' or 'json', got '{v}'"),
						})
					})
					.transpose()?,
			}),
			audit: Some(AuditConfigLayer {
				enabled: env_bool("BASTION_SERVER_AUDIT_ENABLED"),
				queue_capacity: env_parse("BASTION_SERVER_AUDIT_QUEUE_CAPACITY")?,
				queue_overflow_policy: env_var("BASTION_SERVER_AUDIT_QUEUE_OVERFLOW_POLICY").map(
					|v| match v.to_ascii_lowercase().as_str() {
						"block" => QueueOverflowPolicy::Block,
						_ => QueueOverflowPolicy::DropNewest,
					},
				),
				min_severity: env_var("BASTION_SERVER_AUDIT_MIN_SEVERITY"),
			}),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("cannot parse '{v}' as {}", std::any::type_name::<T>()),
		}),
		None => Ok(None),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn missing_file_yields_empty_layer() {
		let layer = TomlSource::new("/nonexistent/bastion.toml").load().unwrap();
		assert!(layer.http.is_none());
		assert!(layer.completion.is_none());
	}

	#[test]
	fn toml_file_is_parsed() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
			[http]
			port = 9443

			[usage]
			daily_suggestion_limit = 12

			[logging]
			format = "json"
			"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.http.unwrap().port, Some(9443));
		assert_eq!(layer.usage.unwrap().daily_suggestion_limit, Some(12));
		assert_eq!(layer.logging.unwrap().format, Some(LogFormat::Json));
	}

	#[test]
	fn malformed_toml_reports_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "[http\nport = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn unparsable_number_is_rejected() {
		std::env::set_var("BASTION_TEST_CONFIG_PORT", "not-a-port");
		let err = env_parse::<u16>("BASTION_TEST_CONFIG_PORT").unwrap_err();
		assert!(err.to_string().contains("BASTION_TEST_CONFIG_PORT"));
		std::env::remove_var("BASTION_TEST_CONFIG_PORT");
	}
}
