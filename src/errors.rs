// ABOUTME: Unified error handling for the generation control layer
// ABOUTME: Defines error codes, the AppError type, and HTTP status mapping for callers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

//! # Unified Error Handling
//!
//! Central error type for the crate. Every fallible operation returns
//! [`AppResult`]. Error codes group failures by concern so the calling
//! request layer can map them to HTTP responses without inspecting
//! message strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Configuration (1000-1999)
    #[serde(rename = "CONFIG_ERROR")]
    ConfigError = 1000,
    #[serde(rename = "CONFIG_MISSING")]
    ConfigMissing = 1001,

    // Validation (2000-2999)
    #[serde(rename = "INVALID_INPUT")]
    InvalidInput = 2000,
    #[serde(rename = "TEMPLATE_NOT_FOUND")]
    TemplateNotFound = 2001,

    // Provider (3000-3999)
    #[serde(rename = "PROVIDER_ERROR")]
    ProviderError = 3000,
    #[serde(rename = "PROVIDER_RATE_LIMITED")]
    ProviderRateLimited = 3001,
    #[serde(rename = "STREAM_DECODE_ERROR")]
    StreamDecodeError = 3002,
    #[serde(rename = "TIMEOUT")]
    Timeout = 3003,

    // Internal (9000-9999)
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError = 9000,
}

impl ErrorCode {
    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidInput => 400,
            Self::TemplateNotFound => 404,
            Self::ProviderError | Self::StreamDecodeError => 502,
            Self::ProviderRateLimited => 503,
            Self::Timeout => 504,
            Self::ConfigError | Self::ConfigMissing | Self::InternalError => 500,
        }
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::ConfigError => "Configuration error encountered",
            Self::ConfigMissing => "Required configuration is missing",
            Self::InvalidInput => "The provided input is invalid",
            Self::TemplateNotFound => "The requested writing template was not found",
            Self::ProviderError => "The generation provider returned an error",
            Self::ProviderRateLimited => "The generation provider rate limit was exceeded",
            Self::StreamDecodeError => "A streaming frame could not be decoded",
            Self::Timeout => "The generation call exceeded its timeout",
            Self::InternalError => "An internal error occurred",
        }
    }
}

/// Unified error type for the crate
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message (never contains credentials)
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the HTTP status code for this error
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    /// Missing required configuration (e.g. an unset API key)
    pub fn config_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigMissing, message)
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Unknown template id
    pub fn template_not_found(template_id: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::TemplateNotFound,
            format!("template not found: {}", template_id.into()),
        )
    }

    /// Provider-side failure (non-success response, malformed top-level payload)
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ProviderError,
            format!("{}: {}", provider.into(), message.into()),
        )
    }

    /// Undecodable streaming frame (recovered locally, logged only)
    pub fn stream_decode(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StreamDecodeError, message)
    }

    /// Call exceeded its configured timeout
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::new(ErrorCode::InternalError, error.to_string())
    }
}
