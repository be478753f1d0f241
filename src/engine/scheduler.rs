use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::evaluator::evaluate_rule;
use super::pass::{Chain, Pass};
use crate::rule::{RegisteredRule, RuleSnapshot};
use crate::timestamp::Timestamp;

/// Orders rules by priority, then most recent toggle first. Rules with no
/// recorded transition count as oldest; remaining ties keep registration order.
///
/// `promoted` moves one rule to the front without touching its registered
/// priority.
pub(crate) fn schedule(
    rules: &RuleSnapshot,
    recency: &HashMap<String, Timestamp>,
    promoted: Option<&str>,
) -> Vec<Arc<RegisteredRule>> {
    let priority = |rule: &RegisteredRule| {
        if promoted == Some(rule.name.as_str()) {
            f64::NEG_INFINITY
        } else {
            rule.priority
        }
    };
    let mut ordered: Vec<Arc<RegisteredRule>> = rules.iter().cloned().collect();
    ordered.sort_by(|a, b| {
        priority(a)
            .total_cmp(&priority(b))
            .then_with(|| recency.get(&b.name).cmp(&recency.get(&a.name)))
    });
    ordered
}

/// Drives every scheduled rule through the evaluator, one at a time, until the
/// schedule is exhausted or the pass asks to exit.
pub(crate) async fn run_pass(pass: Arc<Pass>) {
    debug!(
        "Starting {} pass over {} rules",
        pass.mode,
        pass.schedule.len()
    );
    for rule in &pass.schedule {
        if pass.should_exit() {
            debug!("Pass exited early before rule {}", rule.name);
            break;
        }
        evaluate_rule(&pass, rule, &Chain::default()).await;
    }
}
