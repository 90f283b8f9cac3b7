//! The full nightly patch-window story: a daily reboot job over three
//! agents, from creation through completion.

use crate::prelude::*;

use warden_core::job::JobTable;
use warden_core::operation::{Action, AgentResult, OperationSpec, TargetSelection};
use warden_core::trigger::{CronField, CronFields, Trigger};
use warden_engine::JobFilter;

fn daily_at_3am_new_york(name: &str) -> warden_core::job::JobSpec {
    warden_core::job::JobSpec {
        name: name.to_string(),
        view: "default".to_string(),
        table: JobTable::Agent,
        trigger: Trigger::Cron {
            fields: CronFields {
                hour: CronField::Value(3),
                minute: CronField::Value(0),
                ..CronFields::default()
            },
            start_date: None,
            end_date: None,
        },
        timezone: "America/New_York".to_string(),
        operation: Some(OperationSpec {
            action: Action::Reboot,
            targets: TargetSelection::View,
            install: None,
        }),
    }
}

#[tokio::test]
async fn daily_reboot_over_three_agents_runs_to_completion() {
    let fx = harness(utc(2026, 6, 9, 12, 0));
    for agent in ["a1", "a2", "a3"] {
        fx.directory.add_agent("default", agent).await;
    }

    // 03:00 America/New_York is 07:00 UTC during EDT
    let job = fx.agent_jobs.create(daily_at_3am_new_york("nightly-reboot")).unwrap();
    assert_eq!(job.next_run_time, Some(utc(2026, 6, 10, 7, 0)));

    // nothing fires early
    fx.clock.set(utc(2026, 6, 10, 6, 59));
    assert!(fx.scheduler.run_due().await.unwrap().is_empty());

    // the trigger fires, one operation fans out to all three queues
    fx.clock.set(utc(2026, 6, 10, 7, 0));
    let receipts = fx.scheduler.run_due().await.unwrap();
    assert_eq!(receipts.len(), 1);
    let op_id = receipts[0].operation_id.clone();

    let op = fx.aggregator.get(&op_id).unwrap();
    assert_eq!(op.counters.total, 3);
    assert_eq!(op.counters.pending_pickup, 3);
    for agent in ["a1", "a2", "a3"] {
        let payloads = fx.queue.fetch(agent).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].order_id, 1);
    }

    // two agents pick up inside the server window; the third is dark
    fx.clock.set(utc(2026, 6, 10, 7, 2));
    for agent in ["a1", "a2"] {
        let claimed = fx.queue.pickup(agent).await.unwrap();
        assert_eq!(claimed.len(), 1);
    }
    let op = fx.aggregator.get(&op_id).unwrap();
    assert_eq!(op.counters.pending_pickup, 1);
    assert_eq!(op.counters.pending_results, 2);

    // both report back
    fx.clock.set(utc(2026, 6, 10, 7, 6));
    for (agent, result) in [
        ("a1", AgentResult::Completed),
        ("a2", AgentResult::CompletedWithErrors),
    ] {
        let entry = fx.queue.entries_for(agent).unwrap().remove(0);
        fx.queue.ack(&entry.id, result).await.unwrap();
    }

    // the dark agent's entry outlives the server window and is reaped
    fx.clock.set(utc(2026, 6, 10, 7, 11));
    let report = fx.sweeper.sweep().await.unwrap();
    assert_eq!(report.server_expired, 1);

    let op = fx.aggregator.get(&op_id).unwrap();
    assert!(op.is_complete());
    assert_eq!(op.counters.completed, 1);
    assert_eq!(op.counters.completed_with_errors, 1);
    assert_eq!(op.counters.expired, 1);
    assert_eq!(op.counters.pending_pickup, 0);
    assert_eq!(op.counters.pending_results, 0);

    // the job rolled over to the next night
    let job = fx.agent_jobs.get(&job.id).unwrap();
    assert_eq!(job.run_count, 1);
    assert_eq!(job.next_run_time, Some(utc(2026, 6, 11, 7, 0)));
    assert!(fx.queue.entries_for("a3").unwrap().is_empty());
}

#[tokio::test]
async fn the_second_night_reuses_nothing_from_the_first() {
    let fx = harness(utc(2026, 6, 9, 12, 0));
    fx.directory.add_agent("default", "a1").await;
    let job = fx
        .agent_jobs
        .create(daily_at_3am_new_york("nightly-reboot"))
        .unwrap();

    fx.clock.set(utc(2026, 6, 10, 7, 0));
    let first = fx.scheduler.run_due().await.unwrap().remove(0);
    let entry = fx.queue.entries_for("a1").unwrap().remove(0);
    fx.queue.ack(&entry.id, AgentResult::Completed).await.unwrap();

    fx.clock.set(utc(2026, 6, 11, 7, 0));
    let second = fx.scheduler.run_due().await.unwrap().remove(0);
    assert_ne!(second.operation_id, first.operation_id);

    // the new entry carries the next order id, never a reused one
    let entry = fx.queue.entries_for("a1").unwrap().remove(0);
    assert_eq!(entry.order_id, 2);

    // the job's single history record tracks both fires
    let history = fx.store.load_history(&job.id.0).unwrap();
    assert_eq!(history.run_count, 2);
    assert_eq!(history.last_operation_id, Some(second.operation_id));
}

#[tokio::test]
async fn due_jobs_are_visible_through_list_before_firing() {
    let fx = harness(utc(2026, 6, 9, 12, 0));
    fx.directory.add_agent("default", "a1").await;
    fx.agent_jobs.create(daily_at_3am_new_york("nightly-reboot")).unwrap();

    let jobs = fx.agent_jobs.list(&JobFilter::view("default")).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].name, "nightly-reboot");
}
