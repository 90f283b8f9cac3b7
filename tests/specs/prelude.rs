//! Shared fixture: the fully wired engine over a temp store

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use warden_core::clock::FakeClock;
use warden_core::ids::SeqSource;
use warden_core::job::{JobSpec, JobTable};
use warden_core::operation::{Action, OperationSpec, TargetSelection};
use warden_core::queue::TtlPolicy;
use warden_core::storage::JsonStore;
use warden_core::trigger::Trigger;
use warden_engine::{
    AgentQueueManager, Dispatcher, EngineConfig, ExpirationSweeper, JobManager, Scheduler,
    StaticDirectory, StatusAggregator,
};

pub type TestScheduler = Scheduler<FakeClock, SeqSource, StaticDirectory>;

pub struct Harness {
    pub scheduler: Arc<TestScheduler>,
    pub agent_jobs: JobManager<FakeClock, SeqSource>,
    pub admin_jobs: JobManager<FakeClock, SeqSource>,
    pub queue: AgentQueueManager<FakeClock, SeqSource>,
    pub aggregator: StatusAggregator<FakeClock>,
    pub sweeper: ExpirationSweeper<FakeClock>,
    pub dispatcher: Dispatcher<FakeClock, SeqSource, StaticDirectory>,
    pub directory: Arc<StaticDirectory>,
    pub clock: FakeClock,
    pub store: JsonStore,
    _data: TempDir,
}

pub fn harness(start: DateTime<Utc>) -> Harness {
    let data = TempDir::new().unwrap();
    let store = JsonStore::open(data.path()).unwrap();
    let clock = FakeClock::at(start);
    let ids = SeqSource::new("id");
    let directory = Arc::new(StaticDirectory::new());

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
        TtlPolicy::default(),
        aggregator.clone(),
    );
    let dispatcher = Dispatcher::new(
        store.clone(),
        clock.clone(),
        ids,
        directory.clone(),
        queue.clone(),
        aggregator.clone(),
    );
    let sweeper = ExpirationSweeper::new(store.clone(), clock.clone(), aggregator.clone());
    let config = EngineConfig {
        data_dir: data.path().to_path_buf(),
        tick: Duration::from_millis(10),
        ttl: TtlPolicy::default(),
        ..EngineConfig::default()
    };
    let scheduler = Arc::new(Scheduler::new(
        agent_jobs.clone(),
        admin_jobs.clone(),
        dispatcher.clone(),
        sweeper.clone(),
        clock.clone(),
        &config,
    ));

    Harness {
        scheduler,
        agent_jobs,
        admin_jobs,
        queue,
        aggregator,
        sweeper,
        dispatcher,
        directory,
        clock,
        store,
        _data: data,
    }
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

pub fn reboot_all() -> OperationSpec {
    OperationSpec {
        action: Action::Reboot,
        targets: TargetSelection::View,
        install: None,
    }
}

pub fn one_shot(name: &str, view: &str, run_date: DateTime<Utc>) -> JobSpec {
    JobSpec {
        name: name.to_string(),
        view: view.to_string(),
        table: JobTable::Agent,
        trigger: Trigger::Date { run_date },
        timezone: "UTC".to_string(),
        operation: Some(reboot_all()),
    }
}
