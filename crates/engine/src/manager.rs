// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Job creation, lookup, and lifecycle
//!
//! One manager serves one job table. The agent table holds
//! operator-created jobs; a second manager over the administrative
//! table keeps system jobs in their own namespace. Job names are
//! unique within a view and table.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use tracing::info;
use warden_core::clock::Clock;
use warden_core::event::Event;
use warden_core::ids::IdSource;
use warden_core::job::{
    FieldError, Job, JobDisposition, JobHistory, JobId, JobOutcome, JobSpec, JobTable,
};
use warden_core::operation::{Action, OperationId, OperationSpec, TargetSelection};
use warden_core::storage::{JsonStore, StorageError};
use warden_core::trigger::{CronField, CronFields, Trigger, TriggerKind};

use crate::error::EngineError;
use crate::registry;

/// Composable filters for listing jobs
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub view: Option<String>,
    pub name_contains: Option<String>,
    pub trigger_kind: Option<TriggerKind>,
    pub action: Option<Action>,
    /// Jobs whose target selection would reach this agent
    pub targets_agent: Option<String>,
    /// Jobs targeting exactly this tag
    pub targets_tag: Option<String>,
}

impl JobFilter {
    pub fn view(view: impl Into<String>) -> Self {
        Self {
            view: Some(view.into()),
            ..Self::default()
        }
    }

    fn matches(&self, job: &Job) -> bool {
        if let Some(view) = &self.view {
            if &job.view != view {
                return false;
            }
        }
        if let Some(needle) = &self.name_contains {
            if !job.name.contains(needle.as_str()) {
                return false;
            }
        }
        if let Some(kind) = self.trigger_kind {
            if job.trigger.kind() != kind {
                return false;
            }
        }
        if let Some(action) = self.action {
            if job.operation.as_ref().map(|o| o.action) != Some(action) {
                return false;
            }
        }
        if let Some(agent_id) = &self.targets_agent {
            let hit = match job.operation.as_ref().map(|o| &o.targets) {
                Some(TargetSelection::Agents { agent_ids }) => agent_ids.contains(agent_id),
                // membership is resolved at dispatch, so any agent in
                // the view or under the tag may be reached
                Some(TargetSelection::Tag { .. }) | Some(TargetSelection::View) => true,
                None => false,
            };
            if !hit {
                return false;
            }
        }
        if let Some(tag_id) = &self.targets_tag {
            let targets = job.operation.as_ref().map(|o| &o.targets);
            if !matches!(targets, Some(TargetSelection::Tag { tag_id: t }) if t == tag_id) {
                return false;
            }
        }
        true
    }
}

/// Anchor instant for the recurring-job helpers. Calendar fields are
/// read in the job's timezone, so "daily from 2026-03-01 03:30 Chicago"
/// fires at 03:30 Chicago wall-clock every day.
#[derive(Debug, Clone, Copy)]
pub struct RecurrenceStart(pub DateTime<Utc>);

/// Manages jobs in one table
#[derive(Clone)]
pub struct JobManager<C: Clock, I: IdSource> {
    store: JsonStore,
    clock: C,
    ids: I,
    table: JobTable,
}

impl<C: Clock, I: IdSource> JobManager<C, I> {
    pub fn new(store: JsonStore, clock: C, ids: I, table: JobTable) -> Self {
        Self {
            store,
            clock,
            ids,
            table,
        }
    }

    pub fn table(&self) -> JobTable {
        self.table
    }

    /// The backing store, shared with the other engine components
    pub fn store_handle(&self) -> JsonStore {
        self.store.clone()
    }

    /// Validate and persist a new job. Reports every invalid field at
    /// once rather than the first one found.
    pub fn create(&self, mut spec: JobSpec) -> Result<Job, EngineError> {
        spec.table = self.table;

        let mut errors = spec.validate();
        // only an administrative job naming a known maintenance routine
        // may go without an operation
        let maintenance = self.table == JobTable::Administrative
            && registry::maintenance_task(&spec.name).is_some();
        if spec.operation.is_none() && !maintenance {
            errors.push(FieldError::new("operation", "required"));
        }
        if !errors.is_empty() {
            return Err(EngineError::InvalidFields(errors));
        }

        let taken = self
            .store
            .list_jobs(self.table)?
            .iter()
            .any(|j| j.view == spec.view && j.name == spec.name);
        if taken {
            return Err(EngineError::DuplicateName {
                name: spec.name,
                view: spec.view,
            });
        }

        let now = self.clock.now();
        let id = JobId(self.ids.generate());
        let Some(job) = Job::from_spec(spec, id, now) else {
            return Err(EngineError::InvalidFields(vec![FieldError::new(
                "trigger",
                "never fires",
            )]));
        };
        self.store.save_job(&job)?;
        let event = Event::JobCreated {
            job_id: job.id.clone(),
            view: job.view.clone(),
        };
        info!(
            event = event.name(),
            job_id = %job.id,
            view = %job.view,
            name = %job.name,
            next_run = ?job.next_run_time,
            "job created"
        );
        Ok(job)
    }

    pub fn get(&self, id: &JobId) -> Result<Job, EngineError> {
        match self.store.load_job(self.table, &id.0) {
            Ok(job) => Ok(job),
            Err(StorageError::NotFound { .. }) => Err(EngineError::JobNotFound(id.0.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a job before its trigger exhausts. The history mirror
    /// keeps the trace, marked cancelled; a job that never fired gets
    /// its mirror written here.
    pub fn cancel(&self, id: &JobId) -> Result<Job, EngineError> {
        let job = self.get(id)?;
        let history = match self.store.load_history(&id.0) {
            Ok(history) => JobHistory {
                disposition: JobDisposition::Cancelled,
                ..history
            },
            Err(StorageError::NotFound { .. }) => JobHistory {
                job_id: job.id.clone(),
                view: job.view.clone(),
                name: job.name.clone(),
                run_count: job.run_count,
                last_fired_at: None,
                last_operation_id: None,
                disposition: JobDisposition::Cancelled,
            },
            Err(e) => return Err(e.into()),
        };
        self.store.save_history(&history)?;
        self.store.delete_job(self.table, &id.0)?;
        let event = Event::JobCancelled {
            job_id: job.id.clone(),
            view: job.view.clone(),
        };
        info!(event = event.name(), job_id = %job.id, view = %job.view, "job cancelled");
        Ok(job)
    }

    /// Jobs matching the filter, soonest fire first (never-firing last)
    pub fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, EngineError> {
        let mut jobs: Vec<Job> = self
            .store
            .list_jobs(self.table)?
            .into_iter()
            .filter(|j| filter.matches(j))
            .collect();
        jobs.sort_by(|a, b| match (a.next_run_time, b.next_run_time) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.name.cmp(&b.name)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.name.cmp(&b.name),
        });
        Ok(jobs)
    }

    /// Every job whose next run time has arrived
    pub fn due(&self, now: DateTime<Utc>) -> Result<Vec<Job>, EngineError> {
        let mut jobs: Vec<Job> = self
            .store
            .list_jobs(self.table)?
            .into_iter()
            .filter(|j| j.is_due(now))
            .collect();
        jobs.sort_by(|a, b| a.next_run_time.cmp(&b.next_run_time));
        Ok(jobs)
    }

    /// Fold one fire into the job: bump its run count, update the
    /// history mirror, reschedule or remove it.
    pub fn complete_run(
        &self,
        job: Job,
        fired_at: DateTime<Utc>,
        operation_id: Option<OperationId>,
    ) -> Result<JobOutcome, EngineError> {
        let (job, outcome) = job.after_run(fired_at);
        let disposition = match &outcome {
            JobOutcome::Rescheduled(_) => JobDisposition::Live,
            JobOutcome::Exhausted => JobDisposition::Exhausted,
        };
        self.store.save_history(&JobHistory {
            job_id: job.id.clone(),
            view: job.view.clone(),
            name: job.name.clone(),
            run_count: job.run_count,
            last_fired_at: Some(fired_at),
            last_operation_id: operation_id,
            disposition,
        })?;

        match &outcome {
            JobOutcome::Rescheduled(next) => {
                self.store.save_job(&job)?;
                let event = Event::JobFired {
                    job_id: job.id.clone(),
                    fired_at,
                };
                info!(event = event.name(), job_id = %job.id, next_run = %next, "job rescheduled");
            }
            JobOutcome::Exhausted => {
                self.store.delete_job(self.table, &job.id.0)?;
                let event = Event::JobExhausted {
                    job_id: job.id.clone(),
                };
                info!(event = event.name(), job_id = %job.id, "job exhausted");
            }
        }
        Ok(outcome)
    }

    // Recurring-job helpers. Each derives cron fields from the anchor
    // instant read in the job's timezone.

    pub fn create_daily(
        &self,
        name: &str,
        view: &str,
        timezone: &str,
        start: RecurrenceStart,
        operation: OperationSpec,
    ) -> Result<Job, EngineError> {
        let local = self.local_anchor(timezone, start)?;
        self.create_cron(
            name,
            view,
            timezone,
            start,
            operation,
            CronFields {
                second: CronField::Value(local.second()),
                minute: CronField::Value(local.minute()),
                hour: CronField::Value(local.hour()),
                ..CronFields::default()
            },
        )
    }

    pub fn create_weekly(
        &self,
        name: &str,
        view: &str,
        timezone: &str,
        start: RecurrenceStart,
        operation: OperationSpec,
    ) -> Result<Job, EngineError> {
        let local = self.local_anchor(timezone, start)?;
        self.create_cron(
            name,
            view,
            timezone,
            start,
            operation,
            CronFields {
                second: CronField::Value(local.second()),
                minute: CronField::Value(local.minute()),
                hour: CronField::Value(local.hour()),
                day_of_week: CronField::Value(local.weekday().num_days_from_sunday()),
                ..CronFields::default()
            },
        )
    }

    pub fn create_monthly(
        &self,
        name: &str,
        view: &str,
        timezone: &str,
        start: RecurrenceStart,
        operation: OperationSpec,
    ) -> Result<Job, EngineError> {
        let local = self.local_anchor(timezone, start)?;
        self.create_cron(
            name,
            view,
            timezone,
            start,
            operation,
            CronFields {
                second: CronField::Value(local.second()),
                minute: CronField::Value(local.minute()),
                hour: CronField::Value(local.hour()),
                day: CronField::Value(local.day()),
                ..CronFields::default()
            },
        )
    }

    pub fn create_yearly(
        &self,
        name: &str,
        view: &str,
        timezone: &str,
        start: RecurrenceStart,
        operation: OperationSpec,
    ) -> Result<Job, EngineError> {
        let local = self.local_anchor(timezone, start)?;
        self.create_cron(
            name,
            view,
            timezone,
            start,
            operation,
            CronFields {
                second: CronField::Value(local.second()),
                minute: CronField::Value(local.minute()),
                hour: CronField::Value(local.hour()),
                day: CronField::Value(local.day()),
                month: CronField::Value(local.month()),
                ..CronFields::default()
            },
        )
    }

    fn local_anchor(
        &self,
        timezone: &str,
        start: RecurrenceStart,
    ) -> Result<DateTime<Tz>, EngineError> {
        let tz: Tz = timezone.parse().map_err(|_| {
            EngineError::InvalidFields(vec![FieldError::new(
                "timezone",
                format!("unknown timezone {:?}", timezone),
            )])
        })?;
        Ok(start.0.with_timezone(&tz))
    }

    fn create_cron(
        &self,
        name: &str,
        view: &str,
        timezone: &str,
        start: RecurrenceStart,
        operation: OperationSpec,
        fields: CronFields,
    ) -> Result<Job, EngineError> {
        self.create(JobSpec {
            name: name.to_string(),
            view: view.to_string(),
            table: self.table,
            trigger: Trigger::Cron {
                fields,
                start_date: Some(start.0),
                end_date: None,
            },
            timezone: timezone.to_string(),
            operation: Some(operation),
        })
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
