// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Domain events emitted by the dispatch pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::job::JobId;
use crate::operation::{Action, AgentResult, OperationId};
use crate::queue::EntryId;

/// Events describing state changes in the system, used for structured
/// logging and the job history mirror
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// A job was created and scheduled
    JobCreated { job_id: JobId, view: String },

    /// A job was cancelled before exhausting its trigger
    JobCancelled { job_id: JobId, view: String },

    /// A job's trigger fired
    JobFired {
        job_id: JobId,
        fired_at: DateTime<Utc>,
    },

    /// A job's trigger will never fire again
    JobExhausted { job_id: JobId },

    /// An operation was materialized over a resolved agent set
    OperationCreated {
        operation_id: OperationId,
        action: Action,
        total: u64,
    },

    /// Every agent of an operation reached a terminal outcome
    OperationCompleted { operation_id: OperationId },

    /// A queue entry was placed for an agent
    EntryEnqueued {
        entry_id: EntryId,
        agent_id: String,
        order_id: u64,
    },

    /// An agent took delivery of an entry
    EntryPickedUp { entry_id: EntryId, agent_id: String },

    /// An entry ran past one of its deadlines
    EntryExpired {
        entry_id: EntryId,
        agent_id: String,
        picked_up: bool,
    },

    /// An agent reported a terminal outcome
    ResultRecorded {
        operation_id: OperationId,
        agent_id: String,
        result: AgentResult,
    },
}

impl Event {
    /// Stable `category:action` name for log lines
    pub fn name(&self) -> &'static str {
        match self {
            Event::JobCreated { .. } => "job:created",
            Event::JobCancelled { .. } => "job:cancelled",
            Event::JobFired { .. } => "job:fired",
            Event::JobExhausted { .. } => "job:exhausted",
            Event::OperationCreated { .. } => "operation:created",
            Event::OperationCompleted { .. } => "operation:completed",
            Event::EntryEnqueued { .. } => "queue:enqueued",
            Event::EntryPickedUp { .. } => "queue:picked_up",
            Event::EntryExpired { .. } => "queue:expired",
            Event::ResultRecorded { .. } => "queue:result",
        }
    }
}
