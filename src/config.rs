// ABOUTME: Per-call generation configuration with optimization switches
// ABOUTME: Immutable per call; the auto-tuner produces new values instead of mutating
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

//! # Generation Configuration
//!
//! The tunable unit of the streaming call coordinator. A config is built
//! from defaults merged with caller overrides at call time and is never
//! mutated afterwards; [`crate::tuning::auto_tune`] returns a fresh value.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default model identifier
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Default maximum output tokens
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// Default streaming chunk size hint (tokens per chunk)
pub const DEFAULT_CHUNK_SIZE: u32 = 20;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configuration for a single generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)] // Optimization switches are independent flags
pub struct GenerationConfig {
    /// Model identifier
    pub model: String,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
    /// Maximum output tokens
    pub max_tokens: u32,
    /// Run the text compressor over outgoing prompts
    pub enable_compression: bool,
    /// Substitute a sentinel for a previously-seen system prompt
    pub enable_prompt_cache: bool,
    /// Request a streaming response
    pub enable_streaming: bool,
    /// Hint the transport to reuse connections
    pub enable_connection_pooling: bool,
    /// Streaming chunk size hint (tokens per chunk)
    pub chunk_size: u32,
    /// Per-call timeout covering the provider call and every chunk wait
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            enable_compression: true,
            enable_prompt_cache: true,
            enable_streaming: true,
            enable_connection_pooling: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GenerationConfig {
    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum output tokens
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Enable or disable prompt compression
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.enable_compression = enabled;
        self
    }

    /// Enable or disable system-prompt caching
    #[must_use]
    pub const fn with_prompt_cache(mut self, enabled: bool) -> Self {
        self.enable_prompt_cache = enabled;
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
