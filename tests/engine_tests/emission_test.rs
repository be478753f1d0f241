use std::sync::atomic::Ordering;

use pretty_assertions::assert_eq;
use rulecast::{ConditionTree, PassStatus, Rule, RulesEngine};
use serde_json::json;

use crate::count_emits;

#[tokio::test]
async fn test_events_fire_iff_test_passes() {
    let engine = RulesEngine::default();
    engine.add_rules([
        Rule::new("cold").test(|facts| facts.get("temp").and_then(|t| t.as_i64()) < Some(10)),
        Rule::new("hot").test(|facts| facts.get("temp").and_then(|t| t.as_i64()) > Some(30)),
        Rule::new("known").test(|facts| facts.get("temp").is_some()),
    ]);
    let cold = count_emits(&engine, "cold");
    let hot = count_emits(&engine, "hot");
    let known = count_emits(&engine, "known");

    assert_eq!(
        engine.update_facts(json!({ "temp": 35 })).await,
        PassStatus::Completed
    );
    assert_eq!(cold.load(Ordering::SeqCst), 0);
    assert_eq!(hot.load(Ordering::SeqCst), 1);
    assert_eq!(known.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_toggle_fires_on_transition_only() {
    let toggled = RulesEngine::default();
    toggled.add_rule(Rule::new("flag").test(|facts| facts.is_truthy("flag")));
    let toggled_count = count_emits(&toggled, "flag");

    let plain = RulesEngine::default();
    plain.add_rule(
        Rule::new("flag")
            .toggle(false)
            .test(|facts| facts.is_truthy("flag")),
    );
    let plain_count = count_emits(&plain, "flag");

    for flag in [false, false, true, true] {
        toggled.update_facts(json!({ "flag": flag })).await;
        plain.update_facts(json!({ "flag": flag })).await;
    }
    assert_eq!(toggled_count.load(Ordering::SeqCst), 1);
    assert_eq!(plain_count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_toggle_rearms_after_failing() {
    let engine = RulesEngine::default();
    engine.add_rule(Rule::new("flag").test(|facts| facts.is_truthy("flag")));
    let count = count_emits(&engine, "flag");
    for flag in [true, true, false, true] {
        engine.update_facts(json!({ "flag": flag })).await;
    }
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_explicit_events_fire_before_own_event() {
    let engine = RulesEngine::default();
    let order = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    for event in ["audit", "notify", "open"] {
        let order = order.clone();
        engine.on(event, "order", move |_| order.lock().unwrap().push(event));
    }
    engine.add_rule(Rule::new("open").events(["notify", "audit"]));
    engine.update_facts(json!({})).await;
    assert_eq!(*order.lock().unwrap(), vec!["notify", "audit", "open"]);
}

#[tokio::test]
async fn test_negated_unknown_rule_passes() {
    let engine = RulesEngine::default();
    engine.add_rule(Rule::new("guarded").conditions("!ghost"));
    engine.add_rule(Rule::new("needs_ghost").conditions("ghost"));
    let guarded = count_emits(&engine, "guarded");
    let needs_ghost = count_emits(&engine, "needs_ghost");
    engine.update_facts(json!({})).await;
    assert_eq!(guarded.load(Ordering::SeqCst), 1);
    assert_eq!(needs_ghost.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_nested_conditions() {
    let engine = RulesEngine::default();
    engine.add_rules([
        Rule::new("rule1").test(|facts| facts.is_truthy("a")),
        Rule::new("rule2").test(|facts| facts.is_truthy("b")),
        Rule::new("rule3").test(|facts| facts.is_truthy("c")),
        Rule::new("combined").toggle(false).conditions(ConditionTree::all([
            ConditionTree::any(["!rule2", "rule3"]),
            "rule1".into(),
        ])),
    ]);
    let combined = count_emits(&engine, "combined");

    engine.update_facts(json!({ "a": true, "b": true, "c": false })).await;
    assert_eq!(combined.load(Ordering::SeqCst), 0);
    engine.update_facts(json!({ "a": true, "b": true, "c": true })).await;
    assert_eq!(combined.load(Ordering::SeqCst), 1);
    engine.update_facts(json!({ "a": true, "b": false, "c": false })).await;
    assert_eq!(combined.load(Ordering::SeqCst), 2);
    engine.update_facts(json!({ "a": false, "b": false, "c": true })).await;
    assert_eq!(combined.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_cyclic_rules_complete() {
    let engine = RulesEngine::default();
    engine.add_rules([
        Rule::new("a").conditions("b"),
        Rule::new("b").conditions("c"),
        Rule::new("c").conditions("a"),
        Rule::new("free"),
    ]);
    let free = count_emits(&engine, "free");
    let a = count_emits(&engine, "a");

    let status = tokio::time::timeout(
        std::time::Duration::from_secs(2),
        engine.update_facts(json!({})),
    )
    .await
    .unwrap();
    assert_eq!(status, PassStatus::Completed);
    assert_eq!(free.load(Ordering::SeqCst), 1);
    assert_eq!(a.load(Ordering::SeqCst), 0);
    assert_eq!(engine.snapshot().evaluated.get("a"), Some(&false));
}

#[tokio::test]
async fn test_removed_handler_not_called() {
    let engine = RulesEngine::default();
    engine.add_rule(Rule::new("open").toggle(false));
    let count = count_emits(&engine, "open");
    engine.update_facts(json!({})).await;
    engine.off("open", None);
    engine.update_facts(json!({})).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}
