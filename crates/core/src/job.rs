// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Scheduled jobs and their run history
//!
//! A job binds a trigger to an operation spec inside one view (tenant).
//! Job names are unique per view and table; the manager enforces that,
//! this module owns the record itself and its pure transitions.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::operation::{OperationId, OperationSpec};
use crate::trigger::Trigger;

pub use crate::trigger::FieldError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        JobId(s)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        JobId(s.to_string())
    }
}

/// Which job table a job lives in. Operator-created jobs and
/// system-maintenance jobs share one schema but separate namespaces,
/// so a sweeper job can never collide with an operator's job name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTable {
    Agent,
    Administrative,
}

impl JobTable {
    /// Storage kind for this table
    pub fn kind(&self) -> &'static str {
        match self {
            JobTable::Agent => "job",
            JobTable::Administrative => "admin_job",
        }
    }
}

impl fmt::Display for JobTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Everything a caller supplies to create a job. The operation is
/// absent only for administrative jobs that name one of the engine's
/// own maintenance routines; the manager enforces that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub view: String,
    #[serde(default = "JobSpec::default_table")]
    pub table: JobTable,
    pub trigger: Trigger,
    #[serde(default = "JobSpec::default_timezone")]
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationSpec>,
}

impl JobSpec {
    fn default_table() -> JobTable {
        JobTable::Agent
    }

    fn default_timezone() -> String {
        "UTC".to_string()
    }

    /// Validate every field, reporting all offenders rather than the
    /// first one found.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be empty"));
        }
        if self.view.trim().is_empty() {
            errors.push(FieldError::new("view", "must not be empty"));
        }
        if self.timezone.parse::<Tz>().is_err() {
            errors.push(FieldError::new(
                "timezone",
                format!("unknown timezone {:?}", self.timezone),
            ));
        }
        errors.extend(self.trigger.validate());
        if let Some(operation) = &self.operation {
            errors.extend(operation.validate());
        }
        errors
    }
}

/// What happened to a job after a run was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The trigger produced another fire time
    Rescheduled(DateTime<Utc>),
    /// One-shot fired, or the trigger ran past its end date
    Exhausted,
}

/// A persisted scheduled job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub view: String,
    pub table: JobTable,
    pub trigger: Trigger,
    pub timezone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationSpec>,
    pub created_at: DateTime<Utc>,
    pub run_count: u64,
    pub next_run_time: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a job from a validated spec. Returns `None` when the
    /// trigger can never fire (already exhausted at creation).
    pub fn from_spec(spec: JobSpec, id: JobId, now: DateTime<Utc>) -> Option<Self> {
        let tz = spec.timezone.parse::<Tz>().ok()?;
        let first = spec.trigger.first_fire(now, tz)?;
        Some(Self {
            id,
            name: spec.name,
            view: spec.view,
            table: spec.table,
            trigger: spec.trigger,
            timezone: spec.timezone,
            operation: spec.operation,
            created_at: now,
            run_count: 0,
            next_run_time: Some(first),
        })
    }

    /// The job's timezone. Falls back to UTC if the stored name no
    /// longer parses (tz database drift across upgrades).
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or(Tz::UTC)
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        matches!(self.next_run_time, Some(at) if at <= now)
    }

    /// Record one fire. Pure: returns the advanced job and whether it
    /// was rescheduled or exhausted.
    pub fn after_run(mut self, fired_at: DateTime<Utc>) -> (Self, JobOutcome) {
        self.run_count += 1;
        let tz = self.tz();
        match self.trigger.next_fire(fired_at, tz) {
            Some(next) => {
                self.next_run_time = Some(next);
                (self, JobOutcome::Rescheduled(next))
            }
            None => {
                self.next_run_time = None;
                (self, JobOutcome::Exhausted)
            }
        }
    }
}

/// Why a job's history mirror stopped tracking a live job, if it has
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobDisposition {
    /// The job is still in its live table
    Live,
    /// Removed by an operator before the trigger ran out
    Cancelled,
    /// The trigger produced its last fire
    Exhausted,
}

/// A job's historical mirror, 1:1 with the job and keyed by its id.
/// Written on every fire and finalized when the job leaves the live
/// table, so a durable trace outlives the job itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHistory {
    pub job_id: JobId,
    pub view: String,
    pub name: String,
    pub run_count: u64,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub last_operation_id: Option<OperationId>,
    pub disposition: JobDisposition,
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
