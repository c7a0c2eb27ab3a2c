// ABOUTME: Main library entry point for the inkforge generation control layer
// ABOUTME: Prompt optimization, streaming metrics, auto-tuning, and quality scoring for AI fiction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

#![deny(unsafe_code)]

//! # Inkforge
//!
//! The control layer between application code and a remote LLM generation
//! endpoint for AI-assisted fiction writing. It shapes outgoing prompts,
//! streams tokens back while measuring performance, feeds those measurements
//! into an auto-tuning loop, and scores finished text for quality.
//!
//! ## Subsystems
//!
//! - **Compression & caching**: [`compress::compress_text`] and
//!   [`prompt_cache::PromptCache`] shrink repeated payloads.
//! - **Streaming coordination**: [`coordinator::GenerationEngine`] owns the
//!   provider call and tees one stream into caller tokens plus a deferred
//!   [`coordinator::PerformanceMetrics`] record.
//! - **Analysis & tuning**: [`tuning::analyze_performance`] diagnoses a
//!   completed call; [`tuning::auto_tune`] revises the next call's config.
//! - **Batch & benchmark**: [`batch::batch_generate`] fans calls out
//!   concurrently; [`batch::benchmark`] measures sequential round-trips.
//! - **Quality scoring**: [`quality::detect_quality`] grades finished text
//!   along five axes.
//! - **Templates**: [`templates::TemplateRegistry`] renders parameterized
//!   writing prompts and drives generations from them.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use futures_util::StreamExt;
//! use inkforge::config::GenerationConfig;
//! use inkforge::coordinator::GenerationEngine;
//! use inkforge::provider::{ChatMessage, CompletionProvider};
//! use inkforge::tuning::{analyze_performance, auto_tune};
//!
//! async fn run(provider: Arc<dyn CompletionProvider>) -> inkforge::errors::AppResult<()> {
//!     let engine = GenerationEngine::new(provider);
//!     let config = GenerationConfig::default();
//!     let messages = vec![ChatMessage::user("续写这一章。")];
//!
//!     let (mut stream, metrics) = engine.stream_generate(messages, &config).await?;
//!     while let Some(token) = stream.next().await {
//!         print!("{}", token?);
//!     }
//!
//!     let metrics = metrics.finish().await?;
//!     let analysis = analyze_performance(&metrics);
//!     let next_config = auto_tune(&metrics, &config);
//!     println!("score {} -> next max_tokens {}", analysis.score, next_config.max_tokens);
//!     Ok(())
//! }
//! ```

/// Concurrent batch orchestration and sequential benchmarking
pub mod batch;

/// Prompt text compression
pub mod compress;

/// Per-call generation configuration
pub mod config;

/// Streaming call coordination and performance metrics
pub mod coordinator;

/// Unified error handling
pub mod errors;

/// Structured logging setup
pub mod logging;

/// System-prompt caching
pub mod prompt_cache;

/// Completion provider abstraction
pub mod provider;

/// Quality detection for generated text
pub mod quality;

/// Parameterized writing templates
pub mod templates;

/// Performance analysis and auto-tuning
pub mod tuning;

pub use batch::{batch_generate, benchmark, BenchmarkReport};
pub use compress::compress_text;
pub use config::GenerationConfig;
pub use coordinator::{GenerationEngine, MetricsHandle, PerformanceMetrics, TokenStream};
pub use errors::{AppError, AppResult, ErrorCode};
pub use prompt_cache::PromptCache;
pub use provider::{ChatMessage, ChatRequest, ChatStream, CompletionProvider, MessageRole, StreamChunk};
pub use quality::{detect_quality, QualityResult};
pub use templates::{TemplateRegistry, WritingTemplate};
pub use tuning::{analyze_performance, auto_tune, PerformanceAnalysis};
