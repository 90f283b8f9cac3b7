// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Read-side projections for the console UI
//!
//! Flat, serializable views with all instants as epoch seconds, so the
//! frontend never parses a datetime.

use serde::Serialize;
use warden_core::job::Job;
use warden_core::operation::{Operation, OperationCounters};
use warden_core::queue::{DeliveryStatus, QueueEntry};

#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub id: String,
    pub name: String,
    pub view: String,
    pub table: &'static str,
    pub trigger_kind: String,
    pub timezone: String,
    /// Absent for maintenance jobs, which dispatch nothing
    pub action: Option<&'static str>,
    pub created_at: i64,
    pub run_count: u64,
    pub next_run_time: Option<i64>,
}

impl From<&Job> for JobView {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.0.clone(),
            name: job.name.clone(),
            view: job.view.clone(),
            table: job.table.kind(),
            trigger_kind: job.trigger.kind().to_string(),
            timezone: job.timezone.clone(),
            action: job.operation.as_ref().map(|o| o.action.name()),
            created_at: job.created_at.timestamp(),
            run_count: job.run_count,
            next_run_time: job.next_run_time.map(|t| t.timestamp()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OperationView {
    pub id: String,
    pub view: String,
    pub action: &'static str,
    pub created_by: String,
    pub job_id: Option<String>,
    pub counters: OperationCounters,
    pub created_at: i64,
    pub completed_time: Option<i64>,
}

impl From<&Operation> for OperationView {
    fn from(op: &Operation) -> Self {
        Self {
            id: op.id.0.clone(),
            view: op.view.clone(),
            action: op.action.name(),
            created_by: op.created_by.clone(),
            job_id: op.job_id.as_ref().map(|j| j.0.clone()),
            counters: op.counters,
            created_at: op.created_at.timestamp(),
            completed_time: op.completed_time.map(|t| t.timestamp()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueEntryView {
    pub entry_id: String,
    pub order_id: u64,
    pub operation_id: String,
    pub action: &'static str,
    pub status: DeliveryStatus,
    pub created_at: i64,
    pub server_expires_at: i64,
    pub agent_expires_at: i64,
}

/// One agent's queue as the console shows it
#[derive(Debug, Clone, Serialize)]
pub struct AgentQueueView {
    pub agent_id: String,
    pub depth: usize,
    pub entries: Vec<QueueEntryView>,
}

impl AgentQueueView {
    /// Entries must already be scoped to the agent and ordered
    pub fn new(agent_id: impl Into<String>, entries: &[QueueEntry]) -> Self {
        let entries: Vec<QueueEntryView> = entries
            .iter()
            .map(|e| QueueEntryView {
                entry_id: e.id.0.clone(),
                order_id: e.order_id,
                operation_id: e.args.operation_id.0.clone(),
                action: e.args.action.name(),
                status: e.status,
                created_at: e.created_at.timestamp(),
                server_expires_at: e.server_expires_at.timestamp(),
                agent_expires_at: e.agent_expires_at.timestamp(),
            })
            .collect();
        Self {
            agent_id: agent_id.into(),
            depth: entries.len(),
            entries,
        }
    }
}
