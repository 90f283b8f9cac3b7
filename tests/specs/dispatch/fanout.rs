//! Target resolution and fan-out behavior

use crate::prelude::*;

use warden_core::operation::{
    Action, AgentResult, InstallArgs, OperationSpec, RestartPolicy, TargetSelection,
};
use warden_engine::{DirectoryError, EngineError};

#[tokio::test]
async fn adhoc_install_dispatch_reaches_only_tagged_agents() {
    let fx = harness(utc(2026, 4, 1, 9, 0));
    fx.directory.tag_agent("hq", "web", "a1").await;
    fx.directory.tag_agent("hq", "web", "a2").await;
    fx.directory.add_agent("hq", "a3").await;

    let spec = OperationSpec {
        action: Action::InstallOsApps,
        targets: TargetSelection::Tag {
            tag_id: "web".to_string(),
        },
        install: Some(InstallArgs {
            app_ids: vec!["kb-5501".to_string(), "kb-5502".to_string()],
            restart: RestartPolicy::Needed,
        }),
    };

    let receipt = fx.dispatcher.dispatch("hq", &spec, "ops", None).await.unwrap();
    assert_eq!(receipt.resolved, 2);
    assert!(!receipt.is_partial());

    let payload = fx.queue.next("a1").unwrap().unwrap();
    assert_eq!(payload.action, Action::InstallOsApps);
    assert_eq!(payload.install.unwrap().app_ids.len(), 2);
    assert!(fx.queue.next("a3").unwrap().is_none());

    // ad-hoc operations have no job behind them
    let op = fx.aggregator.get(&receipt.operation_id).unwrap();
    assert_eq!(op.job_id, None);
}

#[tokio::test]
async fn empty_view_produces_a_complete_noop_operation() {
    let fx = harness(utc(2026, 4, 1, 9, 0));
    fx.directory.add_view("empty-site").await;

    let receipt = fx
        .dispatcher
        .dispatch("empty-site", &reboot_all(), "ops", None)
        .await
        .unwrap();
    assert_eq!(receipt.resolved, 0);

    let op = fx.aggregator.get(&receipt.operation_id).unwrap();
    assert!(op.is_complete());
    assert_eq!(op.counters.total, 0);
}

#[tokio::test]
async fn unknown_targets_fail_loudly_rather_than_silently() {
    let fx = harness(utc(2026, 4, 1, 9, 0));
    fx.directory.add_agent("hq", "a1").await;

    let err = fx
        .dispatcher
        .dispatch("nowhere", &reboot_all(), "ops", None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Directory(DirectoryError::UnknownView(_))
    ));

    let spec = OperationSpec {
        targets: TargetSelection::Tag {
            tag_id: "no-such-tag".to_string(),
        },
        ..reboot_all()
    };
    let err = fx.dispatcher.dispatch("hq", &spec, "ops", None).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Directory(DirectoryError::UnknownTag { .. })
    ));
}

#[tokio::test]
async fn results_fold_into_the_operation_regardless_of_pickup() {
    let fx = harness(utc(2026, 4, 1, 9, 0));
    fx.directory.add_agent("hq", "a1").await;
    fx.directory.add_agent("hq", "a2").await;

    let receipt = fx.dispatcher.dispatch("hq", &reboot_all(), "ops", None).await.unwrap();
    let op_id = receipt.operation_id;

    // a1 follows the pickup protocol; a2's result arrives without one
    fx.queue.pickup("a1").await.unwrap();
    fx.aggregator
        .on_result(&op_id, "a1", AgentResult::Completed, true)
        .await
        .unwrap();
    fx.aggregator
        .on_result(&op_id, "a2", AgentResult::Failed, false)
        .await
        .unwrap();

    let op = fx.aggregator.get(&op_id).unwrap();
    assert!(op.is_complete());
    assert_eq!(op.counters.completed, 1);
    assert_eq!(op.counters.failed, 1);
}
