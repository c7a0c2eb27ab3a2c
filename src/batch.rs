// ABOUTME: Batch orchestration and benchmark running over the streaming coordinator
// ABOUTME: Concurrent call fan-out plus sequential benchmarking with aggregate metrics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

//! # Batch Orchestrator & Benchmark Runner
//!
//! [`batch_generate`] starts N independent calls concurrently and hands each
//! stream/metrics pair back undrained; the callers interleave consumption as
//! they see fit. [`benchmark`] is the opposite: strictly sequential, each
//! stream fully drained before the next starts, with a fixed cool-down
//! between iterations so the provider is not hammered.

use std::time::Duration;

use futures_util::{future, StreamExt};
use tokio::time::sleep;
use tracing::info;

use crate::config::GenerationConfig;
use crate::coordinator::{GenerationEngine, MetricsHandle, PerformanceMetrics, TokenStream};
use crate::errors::{AppError, AppResult};
use crate::provider::ChatMessage;
use serde::{Deserialize, Serialize};

/// Pause between benchmark iterations
pub const BENCHMARK_COOLDOWN: Duration = Duration::from_millis(100);

/// Start a set of independent generation calls concurrently
///
/// Each element resolves independently; this function returns once every
/// call has *started* (provider accepted or rejected it). No stream is
/// drained here — token interleaving across calls is unordered and up to
/// the caller.
pub async fn batch_generate(
    engine: &GenerationEngine,
    requests: Vec<(Vec<ChatMessage>, GenerationConfig)>,
) -> Vec<AppResult<(TokenStream, MetricsHandle)>> {
    let starts = requests
        .into_iter()
        .map(|(messages, config)| async move { engine.stream_generate(messages, &config).await });
    future::join_all(starts).await
}

/// Aggregate metrics over a benchmark run
///
/// Each field of `min` and `max` is reduced independently across
/// iterations; they are not snapshots of a single fastest or slowest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    /// Component-wise mean across iterations
    pub avg: PerformanceMetrics,
    /// Component-wise minimum across iterations
    pub min: PerformanceMetrics,
    /// Component-wise maximum across iterations
    pub max: PerformanceMetrics,
    /// Number of iterations aggregated
    pub iterations: u32,
}

impl BenchmarkReport {
    /// Reduce a non-empty slice of metrics records component-wise
    ///
    /// # Panics
    ///
    /// Panics on an empty slice; `benchmark` guards against that.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn aggregate(runs: &[PerformanceMetrics]) -> Self {
        assert!(!runs.is_empty(), "cannot aggregate zero benchmark runs");

        let count = runs.len() as f64;
        let mean =
            |get: fn(&PerformanceMetrics) -> f64| runs.iter().map(get).sum::<f64>() / count;
        let low = |get: fn(&PerformanceMetrics) -> f64| {
            runs.iter().map(get).fold(f64::INFINITY, f64::min)
        };
        let high = |get: fn(&PerformanceMetrics) -> f64| {
            runs.iter().map(get).fold(f64::NEG_INFINITY, f64::max)
        };

        let total_tokens = runs.iter().map(|m| u64::from(m.token_count)).sum::<u64>();
        let avg_tokens = (total_tokens / runs.len() as u64) as u32;

        let avg = PerformanceMetrics {
            first_token_ms: mean(|m| m.first_token_ms),
            total_ms: mean(|m| m.total_ms),
            token_count: avg_tokens,
            tokens_per_second: mean(|m| m.tokens_per_second),
            avg_chunk_interval_ms: mean(|m| m.avg_chunk_interval_ms),
        };
        let min = PerformanceMetrics {
            first_token_ms: low(|m| m.first_token_ms),
            total_ms: low(|m| m.total_ms),
            token_count: runs.iter().map(|m| m.token_count).min().unwrap_or(0),
            tokens_per_second: low(|m| m.tokens_per_second),
            avg_chunk_interval_ms: low(|m| m.avg_chunk_interval_ms),
        };
        let max = PerformanceMetrics {
            first_token_ms: high(|m| m.first_token_ms),
            total_ms: high(|m| m.total_ms),
            token_count: runs.iter().map(|m| m.token_count).max().unwrap_or(0),
            tokens_per_second: high(|m| m.tokens_per_second),
            avg_chunk_interval_ms: high(|m| m.avg_chunk_interval_ms),
        };

        Self {
            avg,
            min,
            max,
            iterations: runs.len() as u32,
        }
    }
}

/// Run the same call repeatedly and aggregate its metrics
///
/// Strictly sequential: each stream is fully drained before the next call
/// starts, with [`BENCHMARK_COOLDOWN`] between iterations.
///
/// # Errors
///
/// Returns `InvalidInput` for zero iterations, or the first call/stream
/// error encountered.
pub async fn benchmark(
    engine: &GenerationEngine,
    messages: Vec<ChatMessage>,
    config: &GenerationConfig,
    iterations: u32,
) -> AppResult<BenchmarkReport> {
    if iterations == 0 {
        return Err(AppError::invalid_input("benchmark requires at least one iteration"));
    }

    let mut runs = Vec::with_capacity(iterations as usize);
    for i in 0..iterations {
        let (mut stream, handle) = engine.stream_generate(messages.clone(), config).await?;
        while let Some(token) = stream.next().await {
            token?;
        }
        let metrics = handle.finish().await?;
        info!(
            iteration = i + 1,
            total_ms = metrics.total_ms,
            tokens_per_second = metrics.tokens_per_second,
            "benchmark iteration complete"
        );
        runs.push(metrics);

        if i + 1 < iterations {
            sleep(BENCHMARK_COOLDOWN).await;
        }
    }

    Ok(BenchmarkReport::aggregate(&runs))
}

impl GenerationEngine {
    /// Convenience method form of [`batch_generate`]
    pub async fn batch(
        &self,
        requests: Vec<(Vec<ChatMessage>, GenerationConfig)>,
    ) -> Vec<AppResult<(TokenStream, MetricsHandle)>> {
        batch_generate(self, requests).await
    }

    /// Convenience method form of [`benchmark`]
    ///
    /// # Errors
    ///
    /// See [`benchmark`].
    pub async fn benchmark(
        &self,
        messages: Vec<ChatMessage>,
        config: &GenerationConfig,
        iterations: u32,
    ) -> AppResult<BenchmarkReport> {
        benchmark(self, messages, config, iterations).await
    }
}
