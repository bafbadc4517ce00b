// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity assertions from the external auth provider, and Bastion session
//! tokens.
//!
//! An assertion is `<user_id>.<expires_unix>.<hex hmac-sha256>`, the MAC
//! covering `<user_id>.<expires_unix>` under the shared identity secret.
//! Session tokens are 32 random bytes, hex encoded; only their SHA-256 hash
//! is stored.

use bastion_auth_core::UserId;
use bastion_common_secret::SecretString;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
	#[error("identity verification is not configured")]
	NotConfigured,

	#[error("malformed identity assertion")]
	Malformed,

	#[error("identity assertion signature mismatch")]
	BadSignature,

	#[error("identity assertion expired")]
	Expired,
}

pub struct IdentityVerifier {
	secret: Option<SecretString>,
}

impl IdentityVerifier {
	pub fn new(secret: Option<SecretString>) -> Self {
		let secret = secret.filter(|s| !s.is_blank());
		if secret.is_none() {
			tracing::warn!("no identity secret configured, sign-in is disabled");
		}
		Self { secret }
	}

	fn mac(&self) -> Result<HmacSha256, IdentityError> {
		let secret = self.secret.as_ref().ok_or(IdentityError::NotConfigured)?;
		HmacSha256::new_from_slice(secret.expose().as_bytes()).map_err(|_| IdentityError::NotConfigured)
	}

	/// Produces an assertion the way the auth provider does.
	pub fn sign(&self, user_id: UserId, expires_at: DateTime<Utc>) -> Result<String, IdentityError> {
		let payload = format!("{}.{}", user_id, expires_at.timestamp());
		let mut mac = self.mac()?;
		mac.update(payload.as_bytes());
		let signature = hex::encode(mac.finalize().into_bytes());
		Ok(format!("{payload}.{signature}"))
	}

	pub fn verify(&self, assertion: &str) -> Result<UserId, IdentityError> {
		self.verify_at(assertion, Utc::now())
	}

	pub fn verify_at(&self, assertion: &str, now: DateTime<Utc>) -> Result<UserId, IdentityError> {
		let mut mac = self.mac()?;

		let (payload, signature) = assertion.rsplit_once('.').ok_or(IdentityError::Malformed)?;
		let (user_id, expires) = payload.split_once('.').ok_or(IdentityError::Malformed)?;
		let user_id: UserId = user_id.parse().map_err(|_| IdentityError::Malformed)?;
		let expires: i64 = expires.parse().map_err(|_| IdentityError::Malformed)?;
		let signature = hex::decode(signature).map_err(|_| IdentityError::Malformed)?;

		mac.update(payload.as_bytes());
		mac.verify_slice(&signature)
			.map_err(|_| IdentityError::BadSignature)?;

		if expires <= now.timestamp() {
			return Err(IdentityError::Expired);
		}
		Ok(user_id)
	}
}

/// A fresh session token: 32 random bytes, hex encoded.
pub fn generate_session_token() -> String {
	let mut bytes = [0u8; 32];
	rand::rngs::OsRng.fill_bytes(&mut bytes);
	hex::encode(bytes)
}

/// Hex SHA-256 of a bearer token, as stored.
pub fn hash_token(token: &str) -> String {
	hex::encode(Sha256::digest(token.as_bytes()))
}
