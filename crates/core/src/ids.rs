// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Identifier generation
//!
//! Jobs, operations, and queue entries all carry opaque generated ids.
//! Production code uses UUIDs; tests use a sequential source so ids
//! show up predictably in assertions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Produces opaque unique identifiers
pub trait IdSource: Clone + Send + Sync {
    fn generate(&self) -> String;
}

/// UUID v4 ids for production use
#[derive(Clone, Default)]
pub struct UuidSource;

impl IdSource for UuidSource {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic `prefix-N` ids for tests
#[derive(Clone)]
pub struct SeqSource {
    prefix: String,
    next: Arc<AtomicU64>,
}

impl SeqSource {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SeqSource {
    fn default() -> Self {
        Self::new("id")
    }
}

impl IdSource for SeqSource {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        format!("{}-{}", self.prefix, n)
    }
}
