// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server-sent-event parser for streamed chat completions.

use futures::Stream;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::{debug, trace, warn};

use crate::error::CompletionError;
use crate::types::{ApiErrorBody, ChunkUsage, Completion, CompletionEvent, StreamChunk};

pin_project! {
	/// Turns a byte stream of SSE frames into [`CompletionEvent`]s.
	///
	/// Emits one `Delta` per non-empty content fragment and a single
	/// `Completed` carrying the accumulated text when `[DONE]` arrives or the
	/// upstream ends. An `Error` event ends the stream.
	pub struct CompletionStream<S> {
		#[pin]
		inner: S,
		buffer: Vec<u8>,
		content: String,
		finish_reason: Option<String>,
		usage: Option<ChunkUsage>,
		finished: bool,
	}
}

impl<S> CompletionStream<S> {
	pub fn new(inner: S) -> Self {
		Self {
			inner,
			buffer: Vec::new(),
			content: String::new(),
			finish_reason: None,
			usage: None,
			finished: false,
		}
	}
}

impl<S, E> Stream for CompletionStream<S>
where
	S: Stream<Item = Result<bytes::Bytes, E>>,
	E: std::fmt::Display,
{
	type Item = CompletionEvent;

	fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
		let mut this = self.project();

		if *this.finished {
			return Poll::Ready(None);
		}

		loop {
			let mut state = ParseState {
				content: &mut *this.content,
				finish_reason: &mut *this.finish_reason,
				usage: &mut *this.usage,
				finished: &mut *this.finished,
			};
			if let Some(event) = next_event(&mut *this.buffer, &mut state) {
				return Poll::Ready(Some(event));
			}

			match this.inner.as_mut().poll_next(cx) {
				Poll::Ready(Some(Ok(bytes))) => {
					trace!(bytes_len = bytes.len(), "received SSE data chunk");
					this.buffer.extend_from_slice(&bytes);
				}
				Poll::Ready(Some(Err(e))) => {
					*this.finished = true;
					return Poll::Ready(Some(CompletionEvent::Error(CompletionError::Http(
						e.to_string(),
					))));
				}
				Poll::Ready(None) => {
					*this.finished = true;
					if this.content.is_empty() {
						return Poll::Ready(Some(CompletionEvent::Error(
							CompletionError::InvalidResponse("stream ended without content".to_string()),
						)));
					}
					debug!("stream ended without [DONE] marker");
					return Poll::Ready(Some(CompletionEvent::Completed(Completion {
						content: std::mem::take(this.content),
						finish_reason: this.finish_reason.take(),
						usage: this.usage.take(),
					})));
				}
				Poll::Pending => return Poll::Pending,
			}
		}
	}
}

struct ParseState<'a> {
	content: &'a mut String,
	finish_reason: &'a mut Option<String>,
	usage: &'a mut Option<ChunkUsage>,
	finished: &'a mut bool,
}

/// Consumes complete lines from `buffer` until one yields an event.
fn next_event(buffer: &mut Vec<u8>, state: &mut ParseState<'_>) -> Option<CompletionEvent> {
	while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
		let raw: Vec<u8> = buffer.drain(..=line_end).collect();
		let line = match std::str::from_utf8(&raw) {
			Ok(line) => line.trim_end_matches(['\n', '\r']),
			Err(e) => {
				warn!(error = %e, "invalid UTF-8 in stream");
				*state.finished = true;
				return Some(CompletionEvent::Error(CompletionError::InvalidResponse(format!(
					"invalid UTF-8: {e}"
				))));
			}
		};

		if line.is_empty() || line.starts_with(':') {
			continue;
		}

		let Some(data) = line.strip_prefix("data:") else {
			continue;
		};
		let data = data.trim();

		if data == "[DONE]" {
			debug!("received [DONE] marker");
			*state.finished = true;
			return Some(CompletionEvent::Completed(Completion {
				content: std::mem::take(state.content),
				finish_reason: state.finish_reason.take(),
				usage: state.usage.take(),
			}));
		}

		if let Ok(body) = serde_json::from_str::<ApiErrorBody>(data) {
			warn!(
				error_type = ?body.error.error_type,
				message = %body.error.message,
				"completion API error in stream"
			);
			*state.finished = true;
			return Some(CompletionEvent::Error(CompletionError::Api {
				status: 200,
				message: body.error.message,
			}));
		}

		match serde_json::from_str::<StreamChunk>(data) {
			Ok(chunk) => {
				if chunk.usage.is_some() {
					*state.usage = chunk.usage;
				}
				let mut fragment = String::new();
				for choice in chunk.choices {
					if choice.finish_reason.is_some() {
						*state.finish_reason = choice.finish_reason;
					}
					if let Some(content) = choice.delta.content {
						fragment.push_str(&content);
					}
				}
				if !fragment.is_empty() {
					state.content.push_str(&fragment);
					return Some(CompletionEvent::Delta { content: fragment });
				}
			}
			Err(e) => warn!(error = %e, "failed to parse stream chunk"),
		}
	}

	None
}
