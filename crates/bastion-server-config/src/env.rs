// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Secret loading with the `VAR` / `VAR_FILE` convention.

use std::path::PathBuf;
use std::{env, fs};

use bastion_common_secret::SecretString;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretEnvError {
	#[error("failed to read secret file at {path}: {source}")]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("secret file path in {var} is empty")]
	EmptyPath { var: String },
}

/// Loads a secret from `{var}_FILE` if set, else from `{var}`.
///
/// One trailing newline is stripped from file contents. Empty values count
/// as unset.
pub fn load_secret_env(var: &str) -> Result<Option<SecretString>, SecretEnvError> {
	let file_var = format!("{var}_FILE");

	if let Ok(path) = env::var(&file_var) {
		if path.is_empty() {
			return Err(SecretEnvError::EmptyPath { var: file_var });
		}
		let path = PathBuf::from(path);
		let content = fs::read_to_string(&path).map_err(|source| SecretEnvError::Io {
			path: path.clone(),
			source,
		})?;
		let value = content.strip_suffix('\n').unwrap_or(&content).to_string();
		return Ok(Some(SecretString::new(value)));
	}

	Ok(env::var(var)
		.ok()
		.filter(|v| !v.is_empty())
		.map(SecretString::new))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn reads_direct_value() {
		env::set_var("BASTION_TEST_SECRET_DIRECT", "sk-direct");
		let secret = load_secret_env("BASTION_TEST_SECRET_DIRECT").unwrap().unwrap();
		assert_eq!(secret.expose(), "sk-direct");
		env::remove_var("BASTION_TEST_SECRET_DIRECT");
	}

	#[test]
	fn file_wins_over_value_and_strips_newline() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "from-file").unwrap();

		env::set_var("BASTION_TEST_SECRET_BOTH", "from-env");
		env::set_var("BASTION_TEST_SECRET_BOTH_FILE", file.path());
		let secret = load_secret_env("BASTION_TEST_SECRET_BOTH").unwrap().unwrap();
		assert_eq!(secret.expose(), "from-file");
		env::remove_var("BASTION_TEST_SECRET_BOTH");
		env::remove_var("BASTION_TEST_SECRET_BOTH_FILE");
	}

	#[test]
	fn empty_file_path_is_an_error() {
		env::set_var("BASTION_TEST_SECRET_EMPTY_FILE", "");
		let err = load_secret_env("BASTION_TEST_SECRET_EMPTY").unwrap_err();
		assert!(matches!(err, SecretEnvError::EmptyPath { .. }));
		env::remove_var("BASTION_TEST_SECRET_EMPTY_FILE");
	}

	#[test]
	fn unset_is_none() {
		assert!(load_secret_env("BASTION_TEST_SECRET_UNSET").unwrap().is_none());
	}
}
