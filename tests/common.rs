// ABOUTME: Shared test helpers - a scripted in-memory completion provider
// ABOUTME: Replays a fixed chunk script with optional delays, decode errors, and failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Inkforge Contributors

#![allow(dead_code)] // Each test crate uses a subset of these helpers

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use inkforge::errors::{AppError, AppResult};
use inkforge::provider::{ChatRequest, ChatStream, CompletionProvider, StreamChunk};

/// One step of a scripted stream
#[derive(Debug, Clone)]
pub enum ScriptItem {
    /// Yield a content delta
    Delta(&'static str),
    /// Sleep before the next item
    Delay(u64),
    /// Yield an undecodable-frame error (coordinator must skip it)
    DecodeError,
    /// Yield a fatal mid-stream error
    MidStreamFail(&'static str),
}

/// In-memory provider that replays a fixed script per call
pub struct ScriptedProvider {
    script: Vec<ScriptItem>,
    fail_call: bool,
    calls: Arc<Mutex<Vec<ChatRequest>>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<ScriptItem>) -> Self {
        Self {
            script,
            fail_call: false,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Provider that rejects every call before producing a stream
    pub fn failing() -> Self {
        Self {
            script: Vec::new(),
            fail_call: true,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script that yields each string as one chunk, no delays
    pub fn from_deltas(deltas: &[&'static str]) -> Self {
        Self::new(deltas.iter().copied().map(ScriptItem::Delta).collect())
    }

    /// Requests the provider has received so far
    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete_stream(&self, request: &ChatRequest) -> AppResult<ChatStream> {
        self.calls.lock().unwrap().push(request.clone());

        if self.fail_call {
            return Err(AppError::provider("scripted", "call rejected by script"));
        }

        let script = self.script.clone();
        let stream = stream! {
            for item in script {
                match item {
                    ScriptItem::Delta(content) => yield Ok(StreamChunk::delta(content)),
                    ScriptItem::Delay(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
                    ScriptItem::DecodeError => {
                        yield Err(AppError::stream_decode("scripted undecodable frame"));
                    }
                    ScriptItem::MidStreamFail(message) => {
                        yield Err(AppError::provider("scripted", message));
                        return;
                    }
                }
            }
            yield Ok(StreamChunk::done());
        };

        Ok(Box::pin(stream))
    }
}
