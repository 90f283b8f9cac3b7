// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Daemon lifecycle: build the engine, seed the directory, run

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use warden_core::clock::{Clock, SystemClock};
use warden_core::ids::{IdSource, UuidSource};
use warden_core::job::{JobSpec, JobTable};
use warden_core::storage::{JsonStore, StorageError};
use warden_core::trigger::Trigger;
use warden_engine::{
    AgentQueueManager, Dispatcher, EngineConfig, EngineError, ExpirationSweeper, JobManager,
    Scheduler, SchedulerHandle, StaticDirectory, StatusAggregator, SWEEP_JOB_NAME,
};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("inventory parse error: {0}")]
    Inventory(#[from] toml::de::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Agent inventory, read from `inventory.toml` in the data directory.
/// Deployments that sync inventory from a CMDB rewrite this file and
/// restart.
#[derive(Debug, Default, Deserialize)]
struct Inventory {
    #[serde(default)]
    views: Vec<ViewEntry>,
}

#[derive(Debug, Deserialize)]
struct ViewEntry {
    name: String,
    #[serde(default)]
    agents: Vec<String>,
    #[serde(default)]
    tags: HashMap<String, Vec<String>>,
}

/// A started daemon
pub struct Daemon {
    handle: SchedulerHandle,
}

impl Daemon {
    pub async fn shutdown(self) {
        self.handle.stop().await;
    }
}

/// Wire the engine together and start the scheduler
pub async fn startup(config: &EngineConfig) -> Result<Daemon, LifecycleError> {
    let store = JsonStore::open(&config.data_dir)?;
    let clock = SystemClock;
    let ids = UuidSource;

    let directory = Arc::new(load_inventory(config).await?);

    let agent_jobs = JobManager::new(store.clone(), clock.clone(), ids.clone(), JobTable::Agent);
    let admin_jobs = JobManager::new(
        store.clone(),
        clock.clone(),
        ids.clone(),
        JobTable::Administrative,
    );
    let aggregator = StatusAggregator::new(store.clone(), clock.clone());
    let queue = AgentQueueManager::new(
        store.clone(),
        clock.clone(),
        ids.clone(),
        config.ttl,
        aggregator.clone(),
    );
    let dispatcher = Dispatcher::new(
        store.clone(),
        clock.clone(),
        ids,
        directory,
        queue,
        aggregator.clone(),
    );
    let sweeper = ExpirationSweeper::new(store, clock.clone(), aggregator);

    register_sweep_job(&admin_jobs, &clock, config)?;

    let scheduler = Arc::new(Scheduler::new(
        agent_jobs,
        admin_jobs,
        dispatcher,
        sweeper,
        clock,
        config,
    ));
    let handle = scheduler.start();
    Ok(Daemon { handle })
}

/// Put the expiration sweep on the administrative table so it runs as
/// a regular recurring job. The job survives restarts, so a duplicate
/// name on a later boot just means it is already registered.
fn register_sweep_job<C: Clock, I: IdSource>(
    admin_jobs: &JobManager<C, I>,
    clock: &C,
    config: &EngineConfig,
) -> Result<(), LifecycleError> {
    let spec = JobSpec {
        name: SWEEP_JOB_NAME.to_string(),
        view: "system".to_string(),
        table: JobTable::Administrative,
        trigger: Trigger::Interval {
            start_date: clock.now(),
            end_date: None,
            every: config.sweep_interval,
        },
        timezone: "UTC".to_string(),
        operation: None,
    };
    match admin_jobs.create(spec) {
        Ok(job) => {
            info!(job_id = %job.id, every = ?config.sweep_interval, "sweep job registered");
            Ok(())
        }
        Err(EngineError::DuplicateName { .. }) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn load_inventory(config: &EngineConfig) -> Result<StaticDirectory, LifecycleError> {
    let directory = StaticDirectory::new();
    let path = config.data_dir.join("inventory.toml");
    if !path.exists() {
        warn!(path = %path.display(), "no inventory file, starting with an empty directory");
        return Ok(directory);
    }

    let inventory: Inventory = toml::from_str(&std::fs::read_to_string(&path)?)?;
    let mut views = 0usize;
    let mut agents = 0usize;
    for view in &inventory.views {
        directory.add_view(&view.name).await;
        views += 1;
        for agent in &view.agents {
            directory.add_agent(&view.name, agent).await;
            agents += 1;
        }
        for (tag, tagged) in &view.tags {
            for agent in tagged {
                directory.tag_agent(&view.name, tag, agent).await;
            }
        }
    }
    info!(views, agents, "inventory loaded");
    Ok(directory)
}
