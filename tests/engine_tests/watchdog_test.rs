use std::sync::atomic::Ordering;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rulecast::{EngineConfig, PassStatus, Rule, RuleError, RulesEngine};
use serde_json::json;
use tokio::time::sleep;

use crate::count_emits;

fn short_timeouts() -> EngineConfig {
    EngineConfig::default()
        .with_async_timeout(Duration::from_millis(30))
        .with_engine_timeout(Duration::from_millis(1000))
}

#[tokio::test]
async fn test_misbehaving_tests_fail_and_pass_continues() {
    let engine = RulesEngine::new(short_timeouts());
    engine.add_rules([
        Rule::new("slow").priority(1.0).async_test(|_| async {
            sleep(Duration::from_millis(200)).await;
            Ok(true)
        }),
        Rule::new("panics").priority(2.0).test(|_| panic!("bad rule")),
        Rule::new("errors")
            .priority(3.0)
            .try_test(|_| Err(RuleError::failed("missing input"))),
        Rule::new("fine").priority(4.0),
    ]);
    let slow = count_emits(&engine, "slow");
    let fine = count_emits(&engine, "fine");

    assert_eq!(engine.update_facts(json!({})).await, PassStatus::Completed);
    let evaluated = engine.snapshot().evaluated;
    assert_eq!(evaluated.get("slow"), Some(&false));
    assert_eq!(evaluated.get("panics"), Some(&false));
    assert_eq!(evaluated.get("errors"), Some(&false));
    assert_eq!(evaluated.get("fine"), Some(&true));
    assert_eq!(fine.load(Ordering::SeqCst), 1);

    // the late result of the timed out test is never applied
    sleep(Duration::from_millis(300)).await;
    assert_eq!(slow.load(Ordering::SeqCst), 0);
    assert_eq!(engine.snapshot().evaluated.get("slow"), Some(&false));
}

#[tokio::test]
async fn test_pass_timeout_discards_results() {
    let config = EngineConfig::default()
        .with_async_timeout(Duration::from_millis(500))
        .with_engine_timeout(Duration::from_millis(40));
    let engine = RulesEngine::new(config);
    engine.add_rules([
        Rule::new("quick").priority(1.0),
        Rule::new("stuck").priority(2.0).async_test(|_| async {
            sleep(Duration::from_millis(300)).await;
            Ok(true)
        }),
    ]);

    assert_eq!(engine.update_facts(json!({})).await, PassStatus::TimedOut);
    assert!(engine.snapshot().evaluated.is_empty());
    assert!(!engine.is_running());

    // the queue keeps working after a timed out pass
    engine.remove_rule("stuck");
    assert_eq!(engine.update_facts(json!({})).await, PassStatus::Completed);
    assert_eq!(engine.snapshot().evaluated.get("quick"), Some(&true));
}
