// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use bastion_common_http::{retry, RetryConfig};
use bastion_common_secret::SecretString;
use bastion_server_config::CompletionConfig;
use futures::Stream;
use reqwest::{Client, StatusCode};
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{CompletionError, Result};
use crate::stream::CompletionStream;
use crate::types::{ApiErrorBody, ChatMessage, ChatRequest, CompletionEvent};

pub type EventStream = Pin<Box<dyn Stream<Item = CompletionEvent> + Send>>;

/// Source of streamed writing suggestions.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
	/// Starts a streamed completion for `prompt`. Errors before the first
	/// byte are returned here; errors mid-stream arrive as
	/// [`CompletionEvent::Error`].
	async fn stream_suggestion(&self, prompt: &str) -> Result<EventStream>;
}

/// Client for an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionClient {
	http_client: Client,
	base_url: String,
	api_key: SecretString,
	model: String,
	temperature: f32,
	max_tokens: u32,
	system_prompt: String,
	retry_config: RetryConfig,
}

impl std::fmt::Debug for ChatCompletionClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ChatCompletionClient")
			.field("base_url", &self.base_url)
			.field("api_key", &self.api_key)
			.field("model", &self.model)
			.finish_non_exhaustive()
	}
}

impl ChatCompletionClient {
	pub fn from_config(config: &CompletionConfig) -> Result<Self> {
		let api_key = config
			.api_key
			.clone()
			.filter(|key| !key.is_blank())
			.ok_or(CompletionError::NotConfigured)?;

		let http_client = bastion_common_http::builder()
			.timeout(Duration::from_secs(config.timeout_secs))
			.build()
			.map_err(|e| CompletionError::Http(e.to_string()))?;

		info!(
			model = %config.model,
			base_url = %config.base_url,
			"initialized completion client"
		);

		Ok(Self {
			http_client,
			base_url: config.base_url.trim_end_matches('/').to_string(),
			api_key,
			model: config.model.clone(),
			temperature: config.temperature,
			max_tokens: config.max_tokens,
			system_prompt: config.system_prompt.clone(),
			retry_config: RetryConfig::default(),
		})
	}

	pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
		self.retry_config = retry_config;
		self
	}

	pub fn chat_request(&self, prompt: &str) -> ChatRequest {
		ChatRequest {
			model: self.model.clone(),
			messages: vec![
				ChatMessage::system(self.system_prompt.clone()),
				ChatMessage::user(prompt),
			],
			temperature: self.temperature,
			max_tokens: self.max_tokens,
			stream: true,
		}
	}

	async fn send(&self, body: &ChatRequest) -> Result<reqwest::Response> {
		let url = format!("{}/chat/completions", self.base_url);
		trace!(url = %url, model = %body.model, "sending completion request");

		let response = self
			.http_client
			.post(&url)
			.bearer_auth(self.api_key.expose())
			.header(reqwest::header::ACCEPT, "text/event-stream")
			.json(body)
			.send()
			.await
			.map_err(|e| {
				if e.is_timeout() {
					CompletionError::Timeout
				} else {
					CompletionError::Http(e.to_string())
				}
			})?;

		if response.status().is_success() {
			Ok(response)
		} else {
			Err(error_from_response(response).await)
		}
	}
}

async fn error_from_response(response: reqwest::Response) -> CompletionError {
	let status = response.status();
	debug!(status = %status, "completion API returned an error status");

	if status == StatusCode::TOO_MANY_REQUESTS {
		let retry_after_secs = response
			.headers()
			.get(reqwest::header::RETRY_AFTER)
			.and_then(|v| v.to_str().ok())
			.and_then(|v| v.parse().ok());
		return CompletionError::RateLimited { retry_after_secs };
	}

	let message = match response.json::<ApiErrorBody>().await {
		Ok(body) => body.error.message,
		Err(_) => format!("HTTP {status}"),
	};
	warn!(status = %status, message = %message, "completion API error");
	CompletionError::Api {
		status: status.as_u16(),
		message,
	}
}

#[async_trait]
impl CompletionProvider for ChatCompletionClient {
	#[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
	async fn stream_suggestion(&self, prompt: &str) -> Result<EventStream> {
		let body = self.chat_request(prompt);
		let response = retry(&self.retry_config, || self.send(&body)).await?;

		debug!("completion stream opened");
		Ok(Box::pin(CompletionStream::new(response.bytes_stream())))
	}
}
