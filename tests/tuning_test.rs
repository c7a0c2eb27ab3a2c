// ABOUTME: Integration tests for performance analysis and auto-tuning
// ABOUTME: Covers the threshold table, scoring weights, and the end-to-end slow-call scenario
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use inkforge::config::GenerationConfig;
use inkforge::coordinator::PerformanceMetrics;
use inkforge::tuning::{
    analyze_performance, auto_tune, CHUNK_SIZE_FLOOR, MAX_TOKENS_FLOOR, MIN_TOKENS_PER_SECOND,
};

#[test]
fn test_scenario_b_slow_first_token() {
    // firstTokenTime = 1500, totalTime = 3000, tokenCount = 30
    let metrics = PerformanceMetrics::from_parts(1500.0, 3000.0, 30, 50.0);
    assert!((metrics.tokens_per_second - 10.0).abs() < f64::EPSILON);

    let analysis = analyze_performance(&metrics);
    assert!(analysis.issues.contains(&"first token too slow".to_owned()));
    // tps is exactly at the threshold, not below it
    assert!(!analysis.issues.contains(&"generation too slow".to_owned()));

    let config = GenerationConfig::default()
        .with_compression(false)
        .with_prompt_cache(false);
    let tuned = auto_tune(&metrics, &config);
    assert!(tuned.enable_compression);
    assert!(tuned.enable_prompt_cache);
    assert!(tuned.enable_connection_pooling);
}

#[test]
fn test_every_issue_has_a_recommendation() {
    // All four rows of the threshold table at once
    let metrics = PerformanceMetrics::from_parts(1500.0, 20_000.0, 30, 150.0);
    assert!(metrics.tokens_per_second < MIN_TOKENS_PER_SECOND);

    let analysis = analyze_performance(&metrics);
    assert_eq!(analysis.issues.len(), 3);
    assert_eq!(analysis.issues.len(), analysis.recommendations.len());
    assert!(analysis.score < 50);
}

#[test]
fn test_analysis_is_deterministic() {
    let metrics = PerformanceMetrics::from_parts(700.0, 5000.0, 80, 60.0);
    let a = analyze_performance(&metrics);
    let b = analyze_performance(&metrics);
    assert_eq!(a.score, b.score);
    assert_eq!(a.issues, b.issues);
}

#[test]
fn test_repeated_tuning_respects_floors() {
    let bad = PerformanceMetrics::from_parts(2500.0, 60_000.0, 100, 300.0);
    let mut config = GenerationConfig::default().with_max_tokens(8000);

    for _ in 0..50 {
        config = auto_tune(&bad, &config);
    }

    assert_eq!(config.max_tokens, MAX_TOKENS_FLOOR);
    assert_eq!(config.chunk_size, CHUNK_SIZE_FLOOR);
    assert!(config.enable_compression);
    assert!(config.enable_connection_pooling);
}

#[test]
fn test_tuning_never_mutates_input() {
    let metrics = PerformanceMetrics::from_parts(2000.0, 4000.0, 20, 200.0);
    let config = GenerationConfig::default();
    let snapshot = config.clone();

    let _tuned = auto_tune(&metrics, &config);
    assert_eq!(config, snapshot);
}
