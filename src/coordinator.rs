// ABOUTME: Streaming call coordinator that owns provider calls and derives live metrics
// ABOUTME: Tees one upstream into a caller-facing token stream plus a deferred metrics record
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

//! # Streaming Call Coordinator
//!
//! [`GenerationEngine::stream_generate`] runs the prompt transforms, invokes
//! the external provider, and wraps the returned stream so every content
//! delta reaches two consumers: the caller (in original order, no drops) and
//! an internal accumulator that measures first-token latency, token count,
//! and inter-chunk gaps. The accumulator resolves the [`MetricsHandle`] only
//! after the last token has been yielded.
//!
//! Dropping the token stream early is safe (the upstream is dropped with
//! it), but it leaves the metrics handle unresolved: if you need metrics,
//! drain the stream first.

use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use futures_util::StreamExt;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::compress::{compress_text, compression_ratio};
use crate::config::GenerationConfig;
use crate::errors::{AppError, AppResult, ErrorCode};
use crate::prompt_cache::PromptCache;
use crate::provider::{ChatMessage, ChatRequest, CompletionProvider};
use serde::{Deserialize, Serialize};

/// Caller-facing stream of content deltas, in provider order
pub type TokenStream =
    std::pin::Pin<Box<dyn tokio_stream::Stream<Item = AppResult<String>> + Send>>;

// ============================================================================
// Performance Metrics
// ============================================================================

/// Immutable timing record produced exactly once per fully-drained call
///
/// Invariant: `total_ms >= first_token_ms >= 0` and
/// `tokens_per_second == token_count / total_ms * 1000`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Time to first content-bearing chunk (ms)
    pub first_token_ms: f64,
    /// Total wall time for the call (ms)
    pub total_ms: f64,
    /// Number of content-bearing chunks received
    pub token_count: u32,
    /// Derived throughput (tokens per second)
    pub tokens_per_second: f64,
    /// Mean latency between consecutive chunks (ms); 0 for fewer than 2 chunks
    pub avg_chunk_interval_ms: f64,
}

impl PerformanceMetrics {
    /// Build a metrics record from raw measurements, deriving throughput
    #[must_use]
    pub fn from_parts(
        first_token_ms: f64,
        total_ms: f64,
        token_count: u32,
        avg_chunk_interval_ms: f64,
    ) -> Self {
        let tokens_per_second = if total_ms > 0.0 {
            f64::from(token_count) / total_ms * 1000.0
        } else {
            0.0
        };
        Self {
            first_token_ms,
            total_ms,
            token_count,
            tokens_per_second,
            avg_chunk_interval_ms,
        }
    }
}

/// Deferred result of a call's metrics
///
/// Resolves once the token stream has been fully drained. If the stream is
/// dropped early or fails, `finish` returns an error instead of a partial
/// record.
#[derive(Debug)]
pub struct MetricsHandle {
    rx: oneshot::Receiver<PerformanceMetrics>,
}

impl MetricsHandle {
    /// Wait for the metrics record
    ///
    /// # Errors
    ///
    /// Returns an error if the stream was dropped or failed before
    /// completion; a partially consumed stream never yields metrics.
    pub async fn finish(self) -> AppResult<PerformanceMetrics> {
        self.rx.await.map_err(|_| {
            AppError::internal("token stream was dropped or failed before metrics were finalized")
        })
    }
}

// ============================================================================
// Generation Engine
// ============================================================================

/// Coordinator for streaming generation calls
///
/// Owns the provider handle and the prompt cache. Cheap to share via clone
/// of the inner `Arc`s.
pub struct GenerationEngine {
    provider: Arc<dyn CompletionProvider>,
    prompt_cache: Arc<PromptCache>,
}

impl GenerationEngine {
    /// Create an engine around a provider, with a fresh prompt cache
    #[must_use]
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            prompt_cache: Arc::new(PromptCache::new()),
        }
    }

    /// Create an engine with an externally-owned prompt cache
    #[must_use]
    pub fn with_prompt_cache(provider: Arc<dyn CompletionProvider>, cache: Arc<PromptCache>) -> Self {
        Self {
            provider,
            prompt_cache: cache,
        }
    }

    /// The engine's prompt cache
    #[must_use]
    pub fn prompt_cache(&self) -> &Arc<PromptCache> {
        &self.prompt_cache
    }

    /// Run a streaming generation call
    ///
    /// Applies the text compressor and prompt cache when the config enables
    /// them, invokes the provider, and returns the caller-facing token
    /// stream plus a deferred metrics handle. A provider failure rejects the
    /// call before either artifact exists.
    ///
    /// # Errors
    ///
    /// Returns a provider or timeout error if the call cannot be started.
    pub async fn stream_generate(
        &self,
        messages: Vec<ChatMessage>,
        config: &GenerationConfig,
    ) -> AppResult<(TokenStream, MetricsHandle)> {
        let mut messages = messages;

        if config.enable_compression {
            for message in &mut messages {
                let compressed = compress_text(&message.content);
                let ratio = compression_ratio(&message.content, &compressed);
                if ratio < 1.0 {
                    debug!(role = message.role.as_str(), ratio, "prompt compressed");
                }
                message.content = compressed;
            }
        }

        if config.enable_prompt_cache {
            self.prompt_cache.apply(&mut messages);
        }

        let request = ChatRequest::new(messages)
            .with_model(config.model.clone())
            .with_temperature(config.temperature)
            .with_max_tokens(config.max_tokens);
        let request = if config.enable_streaming {
            request.with_streaming()
        } else {
            request
        };

        let start = Instant::now();
        let deadline = start + config.timeout;

        // Fail fast: no stream, no metrics on a rejected call
        let upstream = tokio::time::timeout_at(deadline, self.provider.complete_stream(&request))
            .await
            .map_err(|_| timeout_error(config.timeout))??;

        info!(
            provider = self.provider.name(),
            model = %config.model,
            "generation stream opened"
        );

        let (metrics_tx, metrics_rx) = oneshot::channel();

        // Single tee loop: forwards every delta to the caller and updates
        // the accumulator, so the network stream is read exactly once.
        let stream = try_stream! {
            let mut upstream = upstream;
            let mut first_token_at: Option<Duration> = None;
            let mut token_count: u32 = 0;
            let mut last_chunk_at = start;
            let mut gap_total = Duration::ZERO;

            loop {
                let next = tokio::time::timeout_at(deadline, upstream.next())
                    .await
                    .map_err(|_| timeout_error_for_deadline(start))?;
                let Some(item) = next else { break };

                match item {
                    Ok(chunk) => {
                        if !chunk.delta.is_empty() {
                            let now = Instant::now();
                            if first_token_at.is_none() {
                                first_token_at = Some(now - start);
                            } else {
                                gap_total += now - last_chunk_at;
                            }
                            last_chunk_at = now;
                            token_count += 1;
                            yield chunk.delta;
                        }
                        if chunk.is_final {
                            break;
                        }
                    }
                    Err(e) if e.code == ErrorCode::StreamDecodeError => {
                        // Transports may split multi-byte content across
                        // frames; skip, do not count, do not abort.
                        warn!(error = %e, "skipping undecodable stream frame");
                    }
                    Err(e) => {
                        Err::<(), AppError>(e)?;
                    }
                }
            }

            let total = start.elapsed();
            let first_token = first_token_at.unwrap_or(total);
            let avg_gap_ms = if token_count > 1 {
                duration_ms(gap_total) / f64::from(token_count - 1)
            } else {
                0.0
            };
            let metrics = PerformanceMetrics::from_parts(
                duration_ms(first_token),
                duration_ms(total),
                token_count,
                avg_gap_ms,
            );
            debug!(
                first_token_ms = metrics.first_token_ms,
                total_ms = metrics.total_ms,
                token_count = metrics.token_count,
                "generation stream drained"
            );
            let _ = metrics_tx.send(metrics);
        };

        Ok((Box::pin(stream), MetricsHandle { rx: metrics_rx }))
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn timeout_error(timeout: Duration) -> AppError {
    AppError::timeout(format!(
        "generation call exceeded its {}ms timeout",
        timeout.as_millis()
    ))
}

fn timeout_error_for_deadline(start: Instant) -> AppError {
    AppError::timeout(format!(
        "generation stream stalled; {}ms elapsed since call start",
        start.elapsed().as_millis()
    ))
}
