// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-core: domain types for the warden fleet dispatch console
//!
//! This crate provides:
//! - Trigger evaluation (date, interval, cron) with timezone support
//! - Job, operation, and agent-queue records with pure state transitions
//! - Clock and id-source abstractions for deterministic tests
//! - JSON document storage

pub mod clock;
pub mod ids;

pub mod event;
pub mod job;
pub mod operation;
pub mod queue;
pub mod storage;
pub mod trigger;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use event::Event;
pub use ids::{IdSource, SeqSource, UuidSource};
pub use job::{FieldError, Job, JobDisposition, JobHistory, JobId, JobOutcome, JobSpec, JobTable};
pub use operation::{
    Action, AgentOpArgs, AgentResult, InstallArgs, Operation, OperationCounters, OperationId,
    OperationSpec, RestartPolicy, TargetSelection,
};
pub use queue::{DeliveryStatus, EntryId, QueueEntry, QueuePayload, TtlPolicy};
pub use storage::{JsonStore, StorageError};
pub use trigger::{CronField, CronFields, Trigger, TriggerKind};
