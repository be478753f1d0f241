use std::sync::atomic::Ordering;

use pretty_assertions::assert_eq;
use rulecast::{ConditionTree, Outcome, Rule, RulesEngine};
use serde_json::json;

use crate::{count_emits, CallLog};

fn door_engine() -> RulesEngine {
    let engine = RulesEngine::default();
    engine.add_rules([
        Rule::new("open").test(|facts| facts.is_truthy("door.open")),
        Rule::new("locked").test(|facts| facts.is_truthy("door.locked")),
        Rule::new("alarm")
            .priority(1.0)
            .event("siren")
            .conditions(ConditionTree::all(["open", "locked"])),
    ]);
    engine
}

#[tokio::test]
async fn test_evaluate_leaves_state_untouched() {
    let engine = door_engine();
    let open = count_emits(&engine, "open");
    let siren = count_emits(&engine, "siren");
    engine
        .update_facts(json!({ "door": { "open": true, "locked": false } }))
        .await;
    assert_eq!(open.load(Ordering::SeqCst), 1);
    let before = engine.snapshot();

    let would_alarm = engine
        .evaluate(
            "siren",
            Some(json!({ "door": { "open": true, "locked": true } }).into()),
        )
        .await;
    assert_eq!(would_alarm, Outcome::Pass);
    assert_eq!(engine.snapshot(), before);

    let would_close = engine
        .evaluate("open", Some(json!({ "door": { "open": false } }).into()))
        .await;
    assert_eq!(would_close, Outcome::Fail);
    assert_eq!(engine.snapshot(), before);

    assert_eq!(open.load(Ordering::SeqCst), 1);
    assert_eq!(siren.load(Ordering::SeqCst), 0);
    assert_eq!(
        engine.get_facts(Some("door.locked")),
        Some(json!(false))
    );
}

#[tokio::test]
async fn test_evaluate_ignores_toggle_state() {
    let engine = door_engine();
    engine
        .update_facts(json!({ "door": { "open": true, "locked": false } }))
        .await;
    // open is still true, so a live pass would suppress it
    assert_eq!(engine.evaluate("open", None).await, Outcome::Pass);
}

#[tokio::test]
async fn test_evaluate_exits_early() {
    let engine = RulesEngine::default();
    let log = CallLog::default();
    for (name, priority) in [("target", 50.0), ("a", 1.0), ("b", 2.0)] {
        let log = log.clone();
        let owned = name.to_string();
        engine.add_rule(Rule::new(name).priority(priority).test(move |_| {
            log.record(&owned);
            true
        }));
    }
    assert_eq!(engine.evaluate("target", None).await, Outcome::Pass);
    assert_eq!(log.calls(), vec!["target"]);
    assert_eq!(engine.rule_names(), vec!["target", "a", "b"]);

    let explicit = RulesEngine::default();
    let log = CallLog::default();
    for (name, priority) in [("first", 1.0), ("second", 2.0), ("third", 3.0)] {
        let log = log.clone();
        let owned = name.to_string();
        explicit.add_rule(
            Rule::new(name)
                .priority(priority)
                .event("shared")
                .test(move |_| {
                    log.record(&owned);
                    owned != "first"
                }),
        );
    }
    assert_eq!(explicit.evaluate("shared", None).await, Outcome::Pass);
    assert_eq!(log.calls(), vec!["first", "second"]);
}

#[tokio::test]
async fn test_evaluate_unknown_event_fails() {
    let engine = door_engine();
    assert_eq!(engine.evaluate("nothing", None).await, Outcome::Fail);
}
