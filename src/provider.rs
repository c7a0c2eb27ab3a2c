// ABOUTME: Streaming completion provider abstraction consumed by the call coordinator
// ABOUTME: Defines the message model, request builder, stream chunk type, and provider trait
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

//! # Completion Provider Interface
//!
//! The wire-level transport (HTTP/SSE framing) lives outside this crate.
//! This module defines the contract it must satisfy: a provider accepts a
//! [`ChatRequest`] and returns an async sequence of [`StreamChunk`] values
//! terminated by a final chunk. Non-content frames are the transport's
//! problem; by the time chunks reach this crate they either carry a content
//! delta or mark the end of the stream.
//!
//! ## Example
//!
//! ```rust,no_run
//! use inkforge::provider::{ChatMessage, ChatRequest, CompletionProvider};
//!
//! async fn example(provider: &dyn CompletionProvider) {
//!     let request = ChatRequest::new(vec![
//!         ChatMessage::system("你是一位网络小说作家。"),
//!         ChatMessage::user("续写下面的章节。"),
//!     ]);
//!     let stream = provider.complete_stream(&request).await;
//! }
//! ```

use std::env;
use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;
use tracing::info;

use crate::errors::{AppError, AppResult};

/// Environment variable for the provider API base URL
pub const API_BASE_URL_ENV: &str = "INKFORGE_API_BASE_URL";

/// Environment variable for the provider API key
pub const API_KEY_ENV: &str = "INKFORGE_API_KEY";

/// Default API base URL when none is configured
const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
    /// Assistant response message
    Assistant,
}

impl MessageRole {
    /// Convert to string representation for API calls
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single message in a chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

// ============================================================================
// Request / Stream Types
// ============================================================================

/// Configuration for a completion request
///
/// This is the subset of [`crate::config::GenerationConfig`] the provider
/// understands; the coordinator builds it after prompt transforms run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Model identifier (provider-specific)
    pub model: Option<String>,
    /// Temperature for response randomness (0.0 - 2.0)
    pub temperature: Option<f32>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Whether to stream the response
    pub stream: bool,
}

impl ChatRequest {
    /// Create a new chat request with messages
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }

    /// Set the model to use
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the maximum tokens
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Enable streaming
    #[must_use]
    pub const fn with_streaming(mut self) -> Self {
        self.stream = true;
        self
    }
}

/// A chunk of a streaming response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Content delta for this chunk
    pub delta: String,
    /// Whether this is the final chunk
    pub is_final: bool,
    /// Finish reason if final
    pub finish_reason: Option<String>,
}

impl StreamChunk {
    /// A content-bearing chunk
    #[must_use]
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            delta: content.into(),
            is_final: false,
            finish_reason: None,
        }
    }

    /// The terminating chunk of a stream
    #[must_use]
    pub fn done() -> Self {
        Self {
            delta: String::new(),
            is_final: true,
            finish_reason: Some("stop".to_owned()),
        }
    }
}

/// Stream type for completion responses
pub type ChatStream = Pin<Box<dyn Stream<Item = AppResult<StreamChunk>> + Send>>;

// ============================================================================
// Provider Trait
// ============================================================================

/// Streaming completion provider contract
///
/// Implementations own the network transport. A provider either fails the
/// call up front (non-success response, malformed top-level payload) or
/// returns a stream; it must not yield a stream for a failed call.
/// Individual undecodable frames may be surfaced as
/// [`crate::errors::ErrorCode::StreamDecodeError`] items, which the
/// coordinator skips without aborting.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Unique provider identifier (e.g. "deepseek", "openai")
    fn name(&self) -> &'static str;

    /// Perform a streaming chat completion
    async fn complete_stream(&self, request: &ChatRequest) -> AppResult<ChatStream>;
}

// ============================================================================
// Provider Settings
// ============================================================================

/// Endpoint configuration for the external provider
///
/// Read from the environment; the transport implementation consumes this.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// API base URL
    pub base_url: String,
    /// API key
    pub api_key: String,
}

impl ProviderSettings {
    /// Create settings from environment variables
    ///
    /// Reads [`API_BASE_URL_ENV`] (defaulted) and [`API_KEY_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::errors::ErrorCode::ConfigMissing`] if the API key is
    /// unset or empty. This is checked before any network attempt.
    pub fn from_env() -> AppResult<Self> {
        let base_url = env::var(API_BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let api_key = env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                AppError::config_missing(format!("{API_KEY_ENV} environment variable is not set"))
            })?;

        info!(base_url = %base_url, "provider settings loaded");
        Ok(Self { base_url, api_key })
    }
}
