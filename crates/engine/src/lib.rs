// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! warden-engine: scheduling and dispatch runtime
//!
//! Ties the domain types together: a job manager that validates and
//! persists jobs, a dispatcher that turns a fired job into an operation
//! fanned out across agent queues, a status aggregator that folds agent
//! reports into operation counters, an expiration sweeper, and the
//! scheduler loop that drives it all.

mod aggregator;
mod config;
mod directory;
mod dispatch;
mod error;
mod manager;
mod projection;
mod queue;
mod registry;
mod scheduler;
mod sweeper;

pub use aggregator::StatusAggregator;
pub use config::{ConfigError, EngineConfig};
pub use directory::{Directory, DirectoryError, StaticDirectory};
pub use dispatch::{DispatchReceipt, Dispatcher};
pub use error::EngineError;
pub use manager::{JobFilter, JobManager, RecurrenceStart};
pub use projection::{AgentQueueView, JobView, OperationView, QueueEntryView};
pub use queue::AgentQueueManager;
pub use registry::{
    action_from_name, fan_out, maintenance_task, MaintenanceTask, ACTIONS, SWEEP_JOB_NAME,
};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use sweeper::{ExpirationSweeper, SweepReport};
