// ABOUTME: System-prompt cache that substitutes a sentinel for a previously-seen prompt
// ABOUTME: Uses a cheap character-prefix probe; best-effort, never affects message order
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

//! # Prompt Cache
//!
//! Repeated calls in one writing session usually carry the same (large)
//! system prompt. On a repeat, the cache swaps that message's content for a
//! short sentinel so the payload shrinks; the provider is expected to expand
//! the sentinel from its own prompt cache.
//!
//! The equality probe compares only the first [`DEFAULT_PREFIX_KEY_CHARS`]
//! characters of the system prompt. Two different prompts sharing that
//! prefix would false-hit; this is an accepted approximation, not an
//! exact-match guarantee. A false *miss* merely costs payload size.
//!
//! State is owned by the instance (no globals) and guarded by a mutex so
//! concurrent calls cannot interleave the body/key pair.

use std::sync::Mutex;

use tracing::debug;

use crate::provider::{ChatMessage, MessageRole};

/// Number of leading characters used as the cache equality probe
pub const DEFAULT_PREFIX_KEY_CHARS: usize = 100;

/// Sentinel substituted for a cache-hit system prompt
pub const CACHE_HIT_SENTINEL: &str = "[cached:system-prompt]";

#[derive(Debug)]
struct CacheEntry {
    /// Prefix key derived from the stored prompt body
    key: String,
    /// Full prompt body, kept so a future exact-match upgrade stays possible
    body: String,
}

/// Process-wide system-prompt cache
#[derive(Debug)]
pub struct PromptCache {
    entry: Mutex<Option<CacheEntry>>,
    prefix_chars: usize,
}

impl Default for PromptCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptCache {
    /// Create an empty cache with the default prefix-probe length
    #[must_use]
    pub fn new() -> Self {
        Self::with_prefix_len(DEFAULT_PREFIX_KEY_CHARS)
    }

    /// Create an empty cache with a custom prefix-probe length
    #[must_use]
    pub fn with_prefix_len(prefix_chars: usize) -> Self {
        Self {
            entry: Mutex::new(None),
            prefix_chars,
        }
    }

    /// Apply the cache to a conversation in place
    ///
    /// On a hit the first system message's content becomes
    /// [`CACHE_HIT_SENTINEL`]; on a miss the cache stores the new prompt and
    /// leaves the messages untouched. Message count and order never change.
    /// Returns whether a hit occurred.
    pub fn apply(&self, messages: &mut [ChatMessage]) -> bool {
        let Some(system) = messages
            .iter_mut()
            .find(|m| m.role == MessageRole::System)
        else {
            return false;
        };

        let key: String = system.content.chars().take(self.prefix_chars).collect();

        let mut guard = self.entry.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match guard.as_ref() {
            Some(entry) if entry.key == key => {
                debug!(prompt_chars = system.content.chars().count(), "system prompt cache hit");
                system.content = CACHE_HIT_SENTINEL.to_owned();
                true
            }
            _ => {
                debug!(prompt_chars = system.content.chars().count(), "system prompt cache miss");
                *guard = Some(CacheEntry {
                    key,
                    body: system.content.clone(),
                });
                false
            }
        }
    }

    /// The last cached system prompt body, if any
    #[must_use]
    pub fn cached_body(&self) -> Option<String> {
        self.entry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(|e| e.body.clone())
    }

    /// Drop any cached prompt
    pub fn clear(&self) {
        *self
            .entry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }
}
