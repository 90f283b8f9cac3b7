//! Job lifecycle across views and tables

use crate::prelude::*;

use std::time::Duration;
use warden_core::trigger::Trigger;
use warden_engine::{EngineError, JobFilter, RecurrenceStart};

#[tokio::test]
async fn names_are_unique_per_view_not_globally() {
    let fx = harness(utc(2026, 2, 1, 10, 0));
    fx.agent_jobs
        .create(one_shot("patch", "hq", utc(2026, 3, 1, 4, 0)))
        .unwrap();

    let clash = fx
        .agent_jobs
        .create(one_shot("patch", "hq", utc(2026, 3, 2, 4, 0)));
    assert!(matches!(clash, Err(EngineError::DuplicateName { .. })));

    fx.agent_jobs
        .create(one_shot("patch", "branch-office", utc(2026, 3, 1, 4, 0)))
        .unwrap();
}

#[tokio::test]
async fn administrative_jobs_live_in_their_own_namespace() {
    let fx = harness(utc(2026, 2, 1, 10, 0));
    fx.agent_jobs
        .create(one_shot("cleanup", "hq", utc(2026, 3, 1, 4, 0)))
        .unwrap();
    fx.admin_jobs
        .create(one_shot("cleanup", "hq", utc(2026, 3, 1, 4, 0)))
        .unwrap();

    assert_eq!(fx.agent_jobs.list(&JobFilter::default()).unwrap().len(), 1);
    assert_eq!(fx.admin_jobs.list(&JobFilter::default()).unwrap().len(), 1);
}

#[tokio::test]
async fn cancelled_jobs_never_fire() {
    let fx = harness(utc(2026, 2, 1, 10, 0));
    fx.directory.add_agent("hq", "a1").await;
    let job = fx
        .agent_jobs
        .create(one_shot("doomed", "hq", utc(2026, 3, 1, 4, 0)))
        .unwrap();
    fx.agent_jobs.cancel(&job.id).unwrap();

    fx.clock.set(utc(2026, 3, 1, 4, 0));
    assert!(fx.scheduler.run_due().await.unwrap().is_empty());
    assert!(fx.queue.fetch("a1").unwrap().is_empty());
}

#[tokio::test]
async fn interval_jobs_stop_at_their_end_date() {
    let fx = harness(utc(2026, 2, 1, 10, 0));
    fx.directory.add_agent("hq", "a1").await;
    let mut spec = one_shot("bounded", "hq", utc(2026, 3, 1, 0, 0));
    spec.trigger = Trigger::Interval {
        start_date: utc(2026, 2, 1, 12, 0),
        end_date: Some(utc(2026, 2, 1, 13, 0)),
        every: Duration::from_secs(3600),
    };
    let job = fx.agent_jobs.create(spec).unwrap();

    fx.clock.set(utc(2026, 2, 1, 12, 0));
    assert_eq!(fx.scheduler.run_due().await.unwrap().len(), 1);
    fx.clock.set(utc(2026, 2, 1, 13, 0));
    assert_eq!(fx.scheduler.run_due().await.unwrap().len(), 1);

    // the trigger is exhausted, the job is gone
    assert!(matches!(
        fx.agent_jobs.get(&job.id),
        Err(EngineError::JobNotFound(_))
    ));
    fx.clock.set(utc(2026, 2, 1, 14, 0));
    assert!(fx.scheduler.run_due().await.unwrap().is_empty());
}

#[tokio::test]
async fn weekly_recurrence_helper_round_trips_through_the_scheduler() {
    let fx = harness(utc(2026, 2, 1, 10, 0));
    fx.directory.add_agent("hq", "a1").await;

    // 2026-03-02 is a Monday; 04:00 UTC
    let start = RecurrenceStart(utc(2026, 3, 2, 4, 0));
    fx.agent_jobs
        .create_weekly("weekly-window", "hq", "UTC", start, reboot_all())
        .unwrap();

    fx.clock.set(utc(2026, 3, 2, 4, 0));
    assert_eq!(fx.scheduler.run_due().await.unwrap().len(), 1);

    // a day later nothing is due; the following Monday it fires again
    fx.clock.set(utc(2026, 3, 3, 4, 0));
    assert!(fx.scheduler.run_due().await.unwrap().is_empty());
    fx.clock.set(utc(2026, 3, 9, 4, 0));
    assert_eq!(fx.scheduler.run_due().await.unwrap().len(), 1);
}
