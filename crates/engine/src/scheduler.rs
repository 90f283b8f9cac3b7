// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! The scheduler loop
//!
//! A constructed, explicitly started runtime: nothing global, nothing
//! fires before `start`. Each tick takes one pass over both job tables
//! and dispatches whatever is due. Administrative jobs whose name is a
//! reserved maintenance task run that routine instead of dispatching,
//! which is how the expiration sweep gets its cadence. Passes are
//! single-flight: a tick that lands while the previous pass is still
//! running is skipped, so a slow dispatch can never double-fire a job.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use warden_core::clock::Clock;
use warden_core::ids::IdSource;

use crate::config::EngineConfig;
use crate::directory::Directory;
use crate::dispatch::{DispatchReceipt, Dispatcher};
use crate::error::EngineError;
use crate::manager::JobManager;
use crate::registry::{self, MaintenanceTask};
use crate::sweeper::ExpirationSweeper;

/// Drives job dispatch and queue sweeping
pub struct Scheduler<C: Clock, I: IdSource, D: Directory> {
    agent_jobs: JobManager<C, I>,
    admin_jobs: JobManager<C, I>,
    dispatcher: Dispatcher<C, I, D>,
    sweeper: ExpirationSweeper<C>,
    clock: C,
    tick: Duration,
    pass_lock: Mutex<()>,
}

/// A running scheduler, stoppable exactly once
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal the loop and wait for the in-flight pass to finish
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl<C, I, D> Scheduler<C, I, D>
where
    C: Clock + 'static,
    I: IdSource + 'static,
    D: Directory + 'static,
{
    pub fn new(
        agent_jobs: JobManager<C, I>,
        admin_jobs: JobManager<C, I>,
        dispatcher: Dispatcher<C, I, D>,
        sweeper: ExpirationSweeper<C>,
        clock: C,
        config: &EngineConfig,
    ) -> Self {
        Self {
            agent_jobs,
            admin_jobs,
            dispatcher,
            sweeper,
            clock,
            tick: config.tick,
            pass_lock: Mutex::new(()),
        }
    }

    /// One pass: dispatch every due job in both tables. Returns the
    /// receipts of what actually went out. Skips silently if another
    /// pass holds the lock.
    pub async fn run_due(&self) -> Result<Vec<DispatchReceipt>, EngineError> {
        let Ok(_held) = self.pass_lock.try_lock() else {
            debug!("pass already running, tick skipped");
            return Ok(Vec::new());
        };

        let now = self.clock.now();
        let mut receipts = Vec::new();
        for job in self.agent_jobs.due(now)? {
            match self.dispatcher.fire(&job).await {
                Ok(receipt) => {
                    // reschedule from now, so missed runs coalesce
                    // into the one that just fired
                    self.agent_jobs
                        .complete_run(job, now, Some(receipt.operation_id.clone()))?;
                    receipts.push(receipt);
                }
                Err(e) => {
                    // job stays due and is retried next pass
                    error!(job_id = %job.id, error = %e, "dispatch failed");
                }
            }
        }
        for job in self.admin_jobs.due(now)? {
            if let Some(task) = registry::maintenance_task(&job.name) {
                match self.run_maintenance(task).await {
                    Ok(()) => {
                        self.admin_jobs.complete_run(job, now, None)?;
                    }
                    Err(e) => {
                        // job stays due and is retried next pass
                        error!(job_id = %job.id, error = %e, "maintenance failed");
                    }
                }
                continue;
            }
            match self.dispatcher.fire(&job).await {
                Ok(receipt) => {
                    self.admin_jobs
                        .complete_run(job, now, Some(receipt.operation_id.clone()))?;
                    receipts.push(receipt);
                }
                Err(e) => {
                    error!(job_id = %job.id, error = %e, "dispatch failed");
                }
            }
        }
        Ok(receipts)
    }

    async fn run_maintenance(&self, task: MaintenanceTask) -> Result<(), EngineError> {
        match task {
            MaintenanceTask::SweepExpiredEntries => {
                let report = self.sweeper.sweep().await?;
                if report.total() > 0 {
                    info!(
                        server_expired = report.server_expired,
                        agent_expired = report.agent_expired,
                        "sweep reaped entries"
                    );
                }
                Ok(())
            }
        }
    }

    /// Spawn the loop. The scheduler keeps running until the returned
    /// handle is stopped.
    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let (shutdown, mut stopped) = watch::channel(false);
        let scheduler = self;
        let task = tokio::spawn(async move {
            let mut tick = tokio::time::interval(scheduler.tick);
            info!(tick = ?scheduler.tick, "scheduler started");
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        if let Err(e) = scheduler.run_due().await {
                            error!(error = %e, "scheduler pass failed");
                        }
                    }
                    _ = stopped.changed() => {
                        info!("scheduler stopping");
                        break;
                    }
                }
            }
        });
        SchedulerHandle { shutdown, task }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
