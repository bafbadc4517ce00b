// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Retry with exponential backoff and jitter.

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

impl RetryConfig {
	pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
		Self {
			max_attempts: max_attempts.max(1),
			base_delay,
			max_delay,
			..Self::default()
		}
	}

	/// Fixed, jitter-free schedule for tests.
	pub fn immediate(max_attempts: u32) -> Self {
		Self {
			max_attempts: max_attempts.max(1),
			base_delay: Duration::ZERO,
			max_delay: Duration::ZERO,
			backoff_factor: 1.0,
			jitter: false,
		}
	}

	/// Delay before retry number `attempt` (zero-based).
	pub fn delay_for(&self, attempt: u32) -> Duration {
		let exp = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
		let capped = exp.min(self.max_delay.as_secs_f64());
		let secs = if self.jitter {
			capped * (0.5 + fastrand::f64())
		} else {
			capped
		};
		Duration::from_secs_f64(secs)
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

pub fn is_retryable_status(status: StatusCode) -> bool {
	matches!(
		status,
		StatusCode::TOO_MANY_REQUESTS
			| StatusCode::REQUEST_TIMEOUT
			| StatusCode::INTERNAL_SERVER_ERROR
			| StatusCode::BAD_GATEWAY
			| StatusCode::SERVICE_UNAVAILABLE
			| StatusCode::GATEWAY_TIMEOUT
	)
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		self.is_timeout() || self.is_connect() || self.status().is_some_and(is_retryable_status)
	}
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. The last error is returned.
pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut op: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Debug,
{
	let mut attempt = 0;
	loop {
		let err = match op().await {
			Ok(value) => return Ok(value),
			Err(err) => err,
		};
		attempt += 1;

		if !err.is_retryable() {
			warn!(error = ?err, attempt, "non-retryable error");
			return Err(err);
		}
		if attempt >= cfg.max_attempts {
			warn!(error = ?err, attempt, max_attempts = cfg.max_attempts, "retry budget exhausted");
			return Err(err);
		}

		let delay = cfg.delay_for(attempt - 1);
		warn!(
			error = ?err,
			attempt,
			delay_ms = delay.as_millis() as u64,
			"retrying after error"
		);
		tokio::time::sleep(delay).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	#[derive(Debug)]
	struct Flaky {
		retryable: bool,
	}

	impl RetryableError for Flaky {
		fn is_retryable(&self) -> bool {
			self.retryable
		}
	}

	#[tokio::test]
	async fn permanent_error_is_not_retried() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = calls.clone();
		let result: Result<(), Flaky> = retry(&RetryConfig::immediate(5), || {
			let counter = counter.clone();
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(Flaky { retryable: false })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn transient_error_uses_full_budget() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = calls.clone();
		let result: Result<(), Flaky> = retry(&RetryConfig::immediate(4), || {
			let counter = counter.clone();
			async move {
				counter.fetch_add(1, Ordering::SeqCst);
				Err(Flaky { retryable: true })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 4);
	}

	#[tokio::test]
	async fn recovers_after_transient_failures() {
		let calls = Arc::new(AtomicU32::new(0));
		let counter = calls.clone();
		let result: Result<u32, Flaky> = retry(&RetryConfig::immediate(3), || {
			let counter = counter.clone();
			async move {
				let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
				if n < 3 {
					Err(Flaky { retryable: true })
				} else {
					Ok(n)
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), 3);
	}

	#[test]
	fn delay_grows_and_caps() {
		let cfg = RetryConfig {
			max_attempts: 5,
			base_delay: Duration::from_millis(100),
			max_delay: Duration::from_millis(350),
			backoff_factor: 2.0,
			jitter: false,
		};
		assert_eq!(cfg.delay_for(0), Duration::from_millis(100));
		assert_eq!(cfg.delay_for(1), Duration::from_millis(200));
		assert_eq!(cfg.delay_for(2), Duration::from_millis(350));
	}

	#[test]
	fn jitter_stays_within_half_to_one_and_a_half() {
		let cfg = RetryConfig::new(3, Duration::from_millis(100), Duration::from_secs(1));
		for _ in 0..50 {
			let d = cfg.delay_for(0).as_secs_f64();
			assert!((0.05..=0.15).contains(&d));
		}
	}

	#[test]
	fn gateway_statuses_are_retryable() {
		assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
		assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
		assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
	}
}
