// ABOUTME: Integration tests for batch orchestration and the benchmark runner
// ABOUTME: Validates concurrent starts, sequential draining, and component-wise aggregation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use common::{ScriptItem, ScriptedProvider};
use futures_util::StreamExt;
use inkforge::batch::{batch_generate, benchmark};
use inkforge::config::GenerationConfig;
use inkforge::coordinator::GenerationEngine;
use inkforge::errors::ErrorCode;
use inkforge::provider::ChatMessage;

fn plain_config() -> GenerationConfig {
    GenerationConfig::default()
        .with_compression(false)
        .with_prompt_cache(false)
}

#[tokio::test]
async fn test_batch_starts_every_call() {
    let provider = Arc::new(ScriptedProvider::from_deltas(&["各", "自", "独", "立"]));
    let engine = GenerationEngine::new(provider.clone());

    let requests = (0..3)
        .map(|i| {
            (
                vec![ChatMessage::user(format!("第{i}路"))],
                plain_config(),
            )
        })
        .collect();

    let results = batch_generate(&engine, requests).await;
    assert_eq!(results.len(), 3);
    // All calls reached the provider before any stream was drained
    assert_eq!(provider.call_count(), 3);

    // Each pair is independently drainable and yields its own metrics
    for result in results {
        let (mut stream, metrics) = result.unwrap();
        let mut text = String::new();
        while let Some(token) = stream.next().await {
            text.push_str(&token.unwrap());
        }
        assert_eq!(text, "各自独立");
        assert_eq!(metrics.finish().await.unwrap().token_count, 4);
    }
}

#[tokio::test]
async fn test_batch_mixes_successes_and_failures() {
    let ok = Arc::new(ScriptedProvider::from_deltas(&["好"]));
    let engine_ok = GenerationEngine::new(ok);
    let failing = Arc::new(ScriptedProvider::failing());
    let engine_bad = GenerationEngine::new(failing);

    let ok_results = engine_ok
        .batch(vec![(vec![ChatMessage::user("a")], plain_config())])
        .await;
    assert!(ok_results.into_iter().all(|r| r.is_ok()));

    let bad_results = engine_bad
        .batch(vec![(vec![ChatMessage::user("b")], plain_config())])
        .await;
    assert!(bad_results
        .into_iter()
        .all(|r| matches!(r, Err(e) if e.code == ErrorCode::ProviderError)));
}

#[tokio::test(start_paused = true)]
async fn test_benchmark_aggregates_component_wise() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        ScriptItem::Delay(100),
        ScriptItem::Delta("一"),
        ScriptItem::Delay(50),
        ScriptItem::Delta("二"),
    ]));
    let engine = GenerationEngine::new(provider.clone());

    let report = benchmark(
        &engine,
        vec![ChatMessage::user("跑分")],
        &plain_config(),
        3,
    )
    .await
    .unwrap();

    assert_eq!(report.iterations, 3);
    assert_eq!(provider.call_count(), 3);

    // Identical scripted runs: min == max == avg per component
    assert_eq!(report.min.token_count, 2);
    assert_eq!(report.max.token_count, 2);
    assert_eq!(report.avg.token_count, 2);
    assert!((report.min.first_token_ms - report.max.first_token_ms).abs() < 5.0);
    assert!(report.avg.first_token_ms >= 100.0);
    assert!(report.avg.total_ms >= 150.0);
}

#[tokio::test]
async fn test_benchmark_zero_iterations_rejected() {
    let provider = Arc::new(ScriptedProvider::from_deltas(&["x"]));
    let engine = GenerationEngine::new(provider.clone());

    let err = benchmark(&engine, vec![ChatMessage::user("x")], &plain_config(), 0)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidInput);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_benchmark_fails_fast_on_provider_error() {
    let provider = Arc::new(ScriptedProvider::failing());
    let engine = GenerationEngine::new(provider.clone());

    let err = benchmark(&engine, vec![ChatMessage::user("x")], &plain_config(), 5)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ProviderError);
    // Sequential semantics: the first failure stops the run
    assert_eq!(provider.call_count(), 1);
}
