// ABOUTME: Performance analysis and auto-tuning over completed call metrics
// ABOUTME: Pure functions producing a diagnosis and, when warranted, a revised config
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

//! # Performance Analyzer / Auto-Tuner
//!
//! Both entry points are pure and deterministic over a
//! [`PerformanceMetrics`] record. [`analyze_performance`] grades a completed
//! call and pairs each detected issue with a recommendation;
//! [`auto_tune`] turns the same thresholds into a revised
//! [`GenerationConfig`] for the next call, never mutating the current one.

use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::coordinator::PerformanceMetrics;

// ============================================================================
// Thresholds
// ============================================================================

/// First-token latency above this is an outright problem (ms)
pub const FIRST_TOKEN_SLOW_MS: f64 = 1000.0;

/// First-token latency above this is worth a nudge (ms)
pub const FIRST_TOKEN_SLUGGISH_MS: f64 = 500.0;

/// Minimum acceptable throughput (tokens per second)
pub const MIN_TOKENS_PER_SECOND: f64 = 10.0;

/// Maximum acceptable mean inter-chunk latency (ms)
pub const MAX_CHUNK_INTERVAL_MS: f64 = 100.0;

/// Auto-tune never reduces `max_tokens` below this floor
pub const MAX_TOKENS_FLOOR: u32 = 1000;

/// Fraction of `max_tokens` kept per throughput-driven reduction
pub const MAX_TOKENS_REDUCTION: f64 = 0.8;

/// Auto-tune never reduces `chunk_size` below this floor
pub const CHUNK_SIZE_FLOOR: u32 = 5;

/// Chunk-size decrement per latency-driven reduction
pub const CHUNK_SIZE_STEP: u32 = 2;

// Composite score: weighted blend of three component ramps
const FIRST_TOKEN_WEIGHT: f64 = 0.5;
const THROUGHPUT_WEIGHT: f64 = 0.3;
const CHUNK_INTERVAL_WEIGHT: f64 = 0.2;

// Component ramps: full marks at the "best" bound, zero at the "worst"
const FIRST_TOKEN_BEST_MS: f64 = 200.0;
const FIRST_TOKEN_WORST_MS: f64 = 2000.0;
const THROUGHPUT_BEST_TPS: f64 = 50.0;
const CHUNK_INTERVAL_BEST_MS: f64 = 20.0;
const CHUNK_INTERVAL_WORST_MS: f64 = 200.0;

// ============================================================================
// Analysis
// ============================================================================

/// Derived, read-only diagnosis of one call's metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceAnalysis {
    /// Composite score 0-100 (50% first token, 30% throughput, 20% interval)
    pub score: u32,
    /// Human-readable issues, empty when the call was healthy
    pub issues: Vec<String>,
    /// One recommendation per issue
    pub recommendations: Vec<String>,
}

/// Analyze a completed call's metrics
///
/// Pure and total; recomputed on demand, never persisted as authoritative
/// state.
#[must_use]
pub fn analyze_performance(metrics: &PerformanceMetrics) -> PerformanceAnalysis {
    let mut issues = Vec::new();
    let mut recommendations = Vec::new();

    if metrics.first_token_ms > FIRST_TOKEN_SLOW_MS {
        issues.push("first token too slow".to_owned());
        recommendations.push("switch to a faster model or shorten the prompt".to_owned());
    } else if metrics.first_token_ms > FIRST_TOKEN_SLUGGISH_MS {
        issues.push("first token somewhat slow".to_owned());
        recommendations.push("enable prompt compression and system-prompt caching".to_owned());
    }

    if metrics.tokens_per_second < MIN_TOKENS_PER_SECOND {
        issues.push("generation too slow".to_owned());
        recommendations.push("use a higher-throughput model or shorten requested output".to_owned());
    }

    if metrics.avg_chunk_interval_ms > MAX_CHUNK_INTERVAL_MS {
        issues.push("streaming latency too high".to_owned());
        recommendations.push("check network path; consider connection pooling".to_owned());
    }

    PerformanceAnalysis {
        score: composite_score(metrics),
        issues,
        recommendations,
    }
}

/// Weighted 0-100 composite of the three component ramps
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn composite_score(metrics: &PerformanceMetrics) -> u32 {
    let first_token = ramp_down(
        metrics.first_token_ms,
        FIRST_TOKEN_BEST_MS,
        FIRST_TOKEN_WORST_MS,
    );
    let throughput = (metrics.tokens_per_second / THROUGHPUT_BEST_TPS * 100.0).clamp(0.0, 100.0);
    let interval = ramp_down(
        metrics.avg_chunk_interval_ms,
        CHUNK_INTERVAL_BEST_MS,
        CHUNK_INTERVAL_WORST_MS,
    );

    let blended = first_token * FIRST_TOKEN_WEIGHT
        + throughput * THROUGHPUT_WEIGHT
        + interval * CHUNK_INTERVAL_WEIGHT;

    blended.round().clamp(0.0, 100.0) as u32
}

/// Linear ramp: 100 at or below `best`, 0 at or above `worst`
fn ramp_down(value: f64, best: f64, worst: f64) -> f64 {
    ((worst - value) / (worst - best) * 100.0).clamp(0.0, 100.0)
}

// ============================================================================
// Auto-Tuning
// ============================================================================

/// Produce a revised config for the next call based on observed metrics
///
/// Never mutates `current`; with no issue present the returned config is
/// value-equal to the input.
#[must_use]
pub fn auto_tune(metrics: &PerformanceMetrics, current: &GenerationConfig) -> GenerationConfig {
    let mut next = current.clone();

    if metrics.first_token_ms > FIRST_TOKEN_SLOW_MS {
        next.enable_compression = true;
        next.enable_prompt_cache = true;
        next.enable_connection_pooling = true;
    }

    if metrics.tokens_per_second < MIN_TOKENS_PER_SECOND {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let reduced = (f64::from(current.max_tokens) * MAX_TOKENS_REDUCTION) as u32;
        next.max_tokens = reduced.max(MAX_TOKENS_FLOOR);
    }

    if metrics.avg_chunk_interval_ms > MAX_CHUNK_INTERVAL_MS {
        next.chunk_size = current.chunk_size.saturating_sub(CHUNK_SIZE_STEP).max(CHUNK_SIZE_FLOOR);
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(first_token_ms: f64, total_ms: f64, tokens: u32, interval_ms: f64) -> PerformanceMetrics {
        PerformanceMetrics::from_parts(first_token_ms, total_ms, tokens, interval_ms)
    }

    #[test]
    fn test_healthy_call_has_no_issues() {
        let analysis = analyze_performance(&metrics(150.0, 2000.0, 100, 15.0));
        assert!(analysis.issues.is_empty());
        assert!(analysis.recommendations.is_empty());
        assert!(analysis.score > 80);
    }

    #[test]
    fn test_slow_first_token_issue() {
        let analysis = analyze_performance(&metrics(1500.0, 3000.0, 30, 50.0));
        assert!(analysis.issues.contains(&"first token too slow".to_owned()));
        assert_eq!(analysis.issues.len(), analysis.recommendations.len());
    }

    #[test]
    fn test_sluggish_first_token_is_distinct() {
        let analysis = analyze_performance(&metrics(700.0, 2000.0, 60, 20.0));
        assert!(analysis.issues.contains(&"first token somewhat slow".to_owned()));
        assert!(!analysis.issues.contains(&"first token too slow".to_owned()));
    }

    #[test]
    fn test_auto_tune_forces_optimizations_on_slow_first_token() {
        let config = GenerationConfig::default()
            .with_compression(false)
            .with_prompt_cache(false);
        let tuned = auto_tune(&metrics(1200.0, 4000.0, 80, 30.0), &config);
        assert!(tuned.enable_compression);
        assert!(tuned.enable_prompt_cache);
        assert!(tuned.enable_connection_pooling);
        // Input untouched
        assert!(!config.enable_compression);
    }

    #[test]
    fn test_auto_tune_max_tokens_floor() {
        let slow = metrics(100.0, 10_000.0, 50, 20.0);
        assert!(slow.tokens_per_second < MIN_TOKENS_PER_SECOND);

        let mut config = GenerationConfig::default().with_max_tokens(2000);
        for _ in 0..20 {
            config = auto_tune(&slow, &config);
        }
        assert_eq!(config.max_tokens, MAX_TOKENS_FLOOR);
    }

    #[test]
    fn test_auto_tune_chunk_size_floor() {
        let laggy = metrics(100.0, 2000.0, 60, 150.0);
        let mut config = GenerationConfig::default();
        for _ in 0..20 {
            config = auto_tune(&laggy, &config);
        }
        assert_eq!(config.chunk_size, CHUNK_SIZE_FLOOR);
    }

    #[test]
    fn test_auto_tune_healthy_metrics_returns_equal_config() {
        let config = GenerationConfig::default();
        let tuned = auto_tune(&metrics(150.0, 2000.0, 100, 15.0), &config);
        assert_eq!(tuned, config);
    }
}
