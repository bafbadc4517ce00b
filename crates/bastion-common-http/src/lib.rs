// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP utilities for Bastion.
//!
//! - An HTTP client builder carrying the Bastion User-Agent
//! - Retry with exponential backoff, used both for outbound HTTP and for
//!   background store writes

mod client;
mod retry;

pub use client::{builder, new_client_with_timeout, user_agent};
pub use retry::{is_retryable_status, retry, RetryConfig, RetryableError};
