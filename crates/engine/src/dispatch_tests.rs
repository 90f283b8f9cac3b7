// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

use super::*;
use chrono::{DateTime, TimeZone, Utc};
use warden_core::clock::FakeClock;
use warden_core::ids::SeqSource;
use warden_core::operation::{Action, TargetSelection};
use warden_core::queue::TtlPolicy;

use crate::directory::{DirectoryError, StaticDirectory};

fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 2, h, m, 0).unwrap()
}

struct Fixture {
    dispatcher: Dispatcher<FakeClock, SeqSource, StaticDirectory>,
    queue: AgentQueueManager<FakeClock, SeqSource>,
    aggregator: StatusAggregator<FakeClock>,
    directory: Arc<StaticDirectory>,
}

fn fixture() -> Fixture {
    fixture_over(JsonStore::open_temp().unwrap())
}

fn fixture_over(store: JsonStore) -> Fixture {
    let clock = FakeClock::at(at(8, 0));
    let ids = SeqSource::new("op");
    let directory = Arc::new(StaticDirectory::new());
    let aggregator = StatusAggregator::new(store.clone(), clock.clone());
    let queue = AgentQueueManager::new(
        store.clone(),
        clock.clone(),
        SeqSource::new("q"),
        TtlPolicy::default(),
        aggregator.clone(),
    );
    let dispatcher = Dispatcher::new(
        store,
        clock,
        ids,
        directory.clone(),
        queue.clone(),
        aggregator.clone(),
    );
    Fixture {
        dispatcher,
        queue,
        aggregator,
        directory,
    }
}

fn reboot(targets: TargetSelection) -> OperationSpec {
    OperationSpec {
        action: Action::Reboot,
        targets,
        install: None,
    }
}

#[tokio::test]
async fn dispatch_enqueues_one_entry_per_resolved_agent() {
    let fx = fixture();
    fx.directory.add_agent("default", "a1").await;
    fx.directory.add_agent("default", "a2").await;
    fx.directory.add_agent("default", "a3").await;

    let receipt = fx
        .dispatcher
        .dispatch("default", &reboot(TargetSelection::View), "admin", None)
        .await
        .unwrap();

    assert_eq!(receipt.resolved, 3);
    assert_eq!(receipt.enqueued, 3);
    assert!(!receipt.is_partial());

    for agent in ["a1", "a2", "a3"] {
        let payloads = fx.queue.fetch(agent).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].operation_id, receipt.operation_id);
        assert_eq!(payloads[0].action, Action::Reboot);
    }

    let op = fx.aggregator.get(&receipt.operation_id).unwrap();
    assert_eq!(op.counters.total, 3);
    assert_eq!(op.counters.pending_pickup, 3);
    assert_eq!(op.created_by, "admin");
}

#[tokio::test]
async fn tag_targets_resolve_to_tagged_agents_only() {
    let fx = fixture();
    fx.directory.tag_agent("default", "web", "a1").await;
    fx.directory.tag_agent("default", "web", "a2").await;
    fx.directory.add_agent("default", "a3").await;

    let receipt = fx
        .dispatcher
        .dispatch(
            "default",
            &reboot(TargetSelection::Tag {
                tag_id: "web".to_string(),
            }),
            "admin",
            None,
        )
        .await
        .unwrap();

    assert_eq!(receipt.resolved, 2);
    assert!(fx.queue.fetch("a3").unwrap().is_empty());
}

#[tokio::test]
async fn explicit_agent_lists_drop_retired_agents_and_duplicates() {
    let fx = fixture();
    fx.directory.add_agent("default", "a1").await;

    let receipt = fx
        .dispatcher
        .dispatch(
            "default",
            &reboot(TargetSelection::Agents {
                agent_ids: vec![
                    "a1".to_string(),
                    "a1".to_string(),
                    "retired".to_string(),
                ],
            }),
            "admin",
            None,
        )
        .await
        .unwrap();

    assert_eq!(receipt.resolved, 1);
    assert_eq!(receipt.enqueued, 1);
}

#[tokio::test]
async fn empty_resolution_yields_a_complete_noop_operation() {
    let fx = fixture();
    fx.directory.add_view("default").await;

    let receipt = fx
        .dispatcher
        .dispatch("default", &reboot(TargetSelection::View), "admin", None)
        .await
        .unwrap();

    assert_eq!(receipt.resolved, 0);
    assert_eq!(receipt.enqueued, 0);
    let op = fx.aggregator.get(&receipt.operation_id).unwrap();
    assert_eq!(op.counters.total, 0);
    assert!(op.is_complete());
}

#[tokio::test]
async fn a_failed_enqueue_folds_the_agent_as_failed() {
    let base = std::env::temp_dir().join(format!("warden-fanout-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&base);
    // a directory squatting on a2's entry path makes exactly that
    // agent's enqueue fail mid-fan-out (entry ids run q-1, q-2, q-3
    // over the sorted agents)
    std::fs::create_dir_all(base.join("queue").join("q-2.json")).unwrap();
    let fx = fixture_over(JsonStore::open(&base).unwrap());
    for agent in ["a1", "a2", "a3"] {
        fx.directory.add_agent("default", agent).await;
    }

    let receipt = fx
        .dispatcher
        .dispatch("default", &reboot(TargetSelection::View), "admin", None)
        .await
        .unwrap();

    assert_eq!(receipt.resolved, 3);
    assert_eq!(receipt.enqueued, 2);
    assert!(receipt.is_partial());

    // the shortfall is already folded in, so the counters still
    // account for every resolved agent
    let op = fx.aggregator.get(&receipt.operation_id).unwrap();
    assert_eq!(op.counters.total, 3);
    assert_eq!(op.counters.failed, 1);
    assert_eq!(op.counters.pending_pickup, 2);
    assert!(!op.is_complete());

    assert_eq!(fx.queue.fetch("a1").unwrap().len(), 1);
    assert_eq!(fx.queue.fetch("a3").unwrap().len(), 1);
    std::fs::remove_dir_all(&base).unwrap();
}

#[tokio::test]
async fn firing_a_job_without_an_operation_is_an_error() {
    let fx = fixture();
    let job = warden_core::job::Job::from_spec(
        warden_core::job::JobSpec {
            name: "expiration-sweep".to_string(),
            view: "system".to_string(),
            table: warden_core::job::JobTable::Administrative,
            trigger: warden_core::trigger::Trigger::Date { run_date: at(9, 0) },
            timezone: "UTC".to_string(),
            operation: None,
        },
        JobId::from("j-1"),
        at(8, 0),
    )
    .unwrap();

    let err = fx.dispatcher.fire(&job).await.unwrap_err();
    assert!(matches!(err, EngineError::NothingToDispatch(_)));
}

#[tokio::test]
async fn unknown_view_fails_resolution() {
    let fx = fixture();
    let err = fx
        .dispatcher
        .dispatch("missing", &reboot(TargetSelection::View), "admin", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Directory(DirectoryError::UnknownView(_))
    ));
}

#[tokio::test]
async fn dispatch_links_the_operation_back_to_its_job() {
    let fx = fixture();
    fx.directory.add_agent("default", "a1").await;

    let receipt = fx
        .dispatcher
        .dispatch(
            "default",
            &reboot(TargetSelection::View),
            "admin",
            Some(JobId::from("j-7")),
        )
        .await
        .unwrap();

    let op = fx.aggregator.get(&receipt.operation_id).unwrap();
    assert_eq!(op.job_id, Some(JobId::from("j-7")));
}
