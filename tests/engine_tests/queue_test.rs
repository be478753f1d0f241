use std::time::Duration;

use pretty_assertions::assert_eq;
use rulecast::{Outcome, PassStatus, Rule, RulesEngine};
use serde_json::json;
use tokio::time::sleep;

use crate::CallLog;

fn recording_engine(log: &CallLog) -> RulesEngine {
    let engine = RulesEngine::default();
    let log = log.clone();
    engine.add_rule(Rule::new("slow").async_test(move |facts| {
        let log = log.clone();
        async move {
            let id = facts.get("id").cloned().unwrap_or_default();
            log.record(&id.to_string());
            sleep(Duration::from_millis(10)).await;
            Ok(true)
        }
    }));
    engine
}

async fn wait_until(condition: impl Fn() -> bool) {
    while !condition() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_concurrent_updates_queue_in_call_order() {
    let log = CallLog::default();
    let engine = recording_engine(&log);

    let mut handles = Vec::new();
    for id in 0..10 {
        let engine_handle = engine.clone();
        handles.push(tokio::spawn(async move {
            engine_handle.update_facts(json!({ "id": id })).await
        }));
        if id == 0 {
            wait_until(|| engine.is_running()).await;
        } else {
            wait_until(|| engine.queued() == id).await;
        }
    }
    assert_eq!(engine.queued(), 9);

    for handle in handles {
        assert_eq!(handle.await.unwrap(), PassStatus::Completed);
    }
    let expected: Vec<String> = (0..10).map(|id| id.to_string()).collect();
    assert_eq!(log.calls(), expected);
    assert_eq!(engine.queued(), 0);
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_evaluate_waits_for_active_pass() {
    let log = CallLog::default();
    let engine = recording_engine(&log);

    let updating = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.update_facts(json!({ "id": "live" })).await })
    };
    wait_until(|| engine.is_running()).await;

    let outcome = engine
        .evaluate("slow", Some(json!({ "id": "sandbox" }).into()))
        .await;
    assert_eq!(outcome, Outcome::Pass);
    updating.await.unwrap();
    assert_eq!(log.calls(), vec!["\"live\"", "\"sandbox\""]);
}

#[tokio::test]
async fn test_abandoned_call_does_not_block_queue() {
    let log = CallLog::default();
    let engine = recording_engine(&log);

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.update_facts(json!({ "id": 1 })).await })
    };
    wait_until(|| engine.is_running()).await;

    let gave_up = tokio::time::timeout(
        Duration::from_millis(1),
        engine.update_facts(json!({ "id": 2 })),
    )
    .await;
    assert!(gave_up.is_err());
    assert_eq!(engine.queued(), 0);

    first.await.unwrap();
    assert_eq!(engine.update_facts(json!({ "id": 3 })).await, PassStatus::Completed);
    assert_eq!(log.calls(), vec!["1", "3"]);
}

#[tokio::test]
async fn test_started_pass_commits_after_caller_gives_up() {
    let engine = RulesEngine::default();
    engine.add_rule(Rule::new("flag").async_test(|facts| async move {
        sleep(Duration::from_millis(50)).await;
        Ok(facts.is_truthy("flag"))
    }));
    engine.update_facts(json!({ "flag": true })).await;

    let gave_up = tokio::time::timeout(
        Duration::from_millis(5),
        engine.update_facts(json!({ "flag": false })),
    )
    .await;
    assert!(gave_up.is_err());
    assert!(engine.is_running());

    // run waits behind the detached pass and reuses its results
    assert_eq!(engine.run().await, PassStatus::Completed);
    assert_eq!(engine.get_facts(Some("flag")), Some(json!(false)));
    assert_eq!(engine.snapshot().evaluated.get("flag"), Some(&false));
}
