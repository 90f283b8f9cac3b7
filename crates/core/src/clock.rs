// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Clock abstraction for testable time handling
//!
//! Trigger evaluation and TTL arithmetic need calendar time, so the
//! clock serves UTC wall-clock timestamps rather than monotonic
//! instants. Everything downstream stores and compares UTC.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// A clock that provides the current UTC time
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current time as whole epoch seconds (boundary representation)
    fn epoch(&self) -> i64 {
        self.now().timestamp()
    }
}

/// Real system clock
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fake clock for testing with controllable time
#[derive(Clone)]
pub struct FakeClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl FakeClock {
    /// Start at an arbitrary fixed point (2026-01-05 09:00:00 UTC)
    pub fn new() -> Self {
        let start = DateTime::from_timestamp(1_767_603_600, 0).unwrap_or_else(Utc::now);
        Self::at(start)
    }

    /// Start at a specific instant
    pub fn at(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current += duration;
    }

    /// Set the clock to a specific instant
    pub fn set(&self, instant: DateTime<Utc>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = instant;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
