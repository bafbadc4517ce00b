// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use bastion_auth_core::{Notice, TeamId, UserId, ValidationError};
use bastion_server_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
	#[error("profile not found for user {0}")]
	ProfileMissing(UserId),

	#[error("team not found: {0}")]
	TeamNotFound(TeamId),

	#[error("already a member of team {0}")]
	AlreadyMember(TeamId),

	#[error("not a member of team {0}")]
	NotMember(TeamId),

	#[error(transparent)]
	Validation(#[from] ValidationError),

	#[error("store error: {0}")]
	Store(#[from] DbError),
}

impl SessionError {
	/// The toast shown to the user for this failure.
	pub fn notice(&self) -> Notice {
		match self {
			SessionError::ProfileMissing(_) => Notice::new(
				"Profile unavailable",
				"Your profile could not be loaded. Please sign in again.",
			),
			SessionError::TeamNotFound(_) => {
				Notice::new("Team not found", "The team you selected no longer exists.")
			}
			SessionError::AlreadyMember(_) => {
				Notice::new("Already a member", "You are already a member of this team.")
			}
			SessionError::NotMember(_) => {
				Notice::new("Not a member", "You are not a member of this team.")
			}
			SessionError::Validation(e) => Notice::new("Invalid input", e.to_string()),
			SessionError::Store(_) => Notice::new(
				"Something went wrong",
				"We could not complete the request. Please try again.",
			),
		}
	}
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn store_errors_do_not_leak_details() {
		let err = SessionError::Store(DbError::Internal("disk I/O error at /var/lib".into()));
		let notice = err.notice();
		assert!(!notice.description.contains("/var/lib"));
		assert_eq!(notice.title, "Something went wrong");
	}

	#[test]
	fn membership_notices() {
		let team = TeamId::generate();
		assert_eq!(SessionError::AlreadyMember(team).notice().title, "Already a member");
		assert_eq!(SessionError::NotMember(team).notice().title, "Not a member");
	}
}
