//! Queue delivery ordering and expiry as an agent experiences them

use crate::prelude::*;

use warden_core::operation::AgentResult;
use warden_engine::AgentQueueView;

#[tokio::test]
async fn an_agent_sees_operations_in_dispatch_order() {
    let fx = harness(utc(2026, 4, 1, 9, 0));
    fx.directory.add_agent("hq", "a1").await;

    let first = fx.dispatcher.dispatch("hq", &reboot_all(), "ops", None).await.unwrap();
    let second = fx.dispatcher.dispatch("hq", &reboot_all(), "ops", None).await.unwrap();

    let payloads = fx.queue.fetch("a1").unwrap();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0].operation_id, first.operation_id);
    assert_eq!(payloads[1].operation_id, second.operation_id);
    assert!(payloads[0].order_id < payloads[1].order_id);
}

#[tokio::test]
async fn payload_deadlines_reflect_the_ttl_policy() {
    let fx = harness(utc(2026, 4, 1, 9, 0));
    fx.directory.add_agent("hq", "a1").await;
    fx.dispatcher.dispatch("hq", &reboot_all(), "ops", None).await.unwrap();

    let payload = fx.queue.next("a1").unwrap().unwrap();
    assert_eq!(payload.server_queue_ttl, utc(2026, 4, 1, 9, 10).timestamp());
    assert_eq!(payload.agent_queue_ttl, utc(2026, 4, 1, 9, 20).timestamp());
}

#[tokio::test]
async fn late_pickup_still_gets_the_full_agent_window() {
    let fx = harness(utc(2026, 4, 1, 9, 0));
    fx.directory.add_agent("hq", "a1").await;
    fx.dispatcher.dispatch("hq", &reboot_all(), "ops", None).await.unwrap();

    // picked up at the last server-window moment
    fx.clock.set(utc(2026, 4, 1, 9, 10));
    assert_eq!(fx.queue.pickup("a1").await.unwrap().len(), 1);

    // five minutes before the agent deadline, a sweep reaps nothing
    fx.clock.set(utc(2026, 4, 1, 9, 15));
    assert_eq!(fx.sweeper.sweep().await.unwrap().total(), 0);

    fx.clock.set(utc(2026, 4, 1, 9, 21));
    assert_eq!(fx.sweeper.sweep().await.unwrap().agent_expired, 1);
}

#[tokio::test]
async fn acked_work_disappears_from_the_queue_view() {
    let fx = harness(utc(2026, 4, 1, 9, 0));
    fx.directory.add_agent("hq", "a1").await;
    let receipt = fx.dispatcher.dispatch("hq", &reboot_all(), "ops", None).await.unwrap();

    fx.queue.pickup("a1").await.unwrap();
    let entry = fx.queue.entries_for("a1").unwrap().remove(0);
    fx.queue.ack(&entry.id, AgentResult::Completed).await.unwrap();

    let view = AgentQueueView::new("a1", &fx.queue.entries_for("a1").unwrap());
    assert_eq!(view.depth, 0);
    assert!(fx.aggregator.get(&receipt.operation_id).unwrap().is_complete());
}

#[tokio::test]
async fn decommissioning_an_agent_clears_its_backlog() {
    let fx = harness(utc(2026, 4, 1, 9, 0));
    fx.directory.add_agent("hq", "a1").await;
    fx.dispatcher.dispatch("hq", &reboot_all(), "ops", None).await.unwrap();
    fx.dispatcher.dispatch("hq", &reboot_all(), "ops", None).await.unwrap();

    assert_eq!(fx.queue.purge_agent("a1").await.unwrap(), 2);

    // order ids keep counting after re-enrollment
    fx.dispatcher.dispatch("hq", &reboot_all(), "ops", None).await.unwrap();
    assert_eq!(fx.queue.next("a1").unwrap().unwrap().order_id, 3);
}
