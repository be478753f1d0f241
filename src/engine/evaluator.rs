use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use super::condition::evaluate_conditions;
use super::pass::{CacheEntry, Chain, Pass};
use super::watchdog;
use crate::rule::{Outcome, RegisteredRule};

/// Evaluates a rule at most once per pass.
///
/// The first caller installs a shared in-flight evaluation in the pass cache;
/// every later caller awaits that same evaluation or reads its result.
pub(crate) async fn evaluate_rule(
    pass: &Arc<Pass>,
    rule: &Arc<RegisteredRule>,
    chain: &Chain,
) -> Outcome {
    if pass.should_exit() {
        return Outcome::Pass;
    }
    let evaluation = {
        let mut cache = pass.lock_cache();
        match cache.get(&rule.name).cloned() {
            Some(CacheEntry::Resolved(passed)) => return passed.into(),
            Some(CacheEntry::Pending(evaluation)) => evaluation,
            None => {
                let evaluation =
                    evaluate_uncached(pass.clone(), rule.clone(), chain.push(&rule.name))
                        .boxed()
                        .shared();
                cache.insert(rule.name.clone(), CacheEntry::Pending(evaluation.clone()));
                evaluation
            }
        }
    };
    evaluation.await
}

async fn evaluate_uncached(pass: Arc<Pass>, rule: Arc<RegisteredRule>, chain: Chain) -> Outcome {
    let conditions_hold = match &rule.conditions {
        Some(conditions) => evaluate_conditions(&pass, conditions, &chain)
            .await
            .is_pass(),
        None => true,
    };
    if pass.should_exit() {
        return Outcome::Pass;
    }

    let passed = if conditions_hold {
        watchdog::run_test(&rule, &pass.facts, pass.async_timeout).await
    } else {
        debug!("Conditions of rule {} failed", rule.name);
        false
    };
    if pass.is_finished() {
        debug!("Ignoring result of rule {} from a finished pass", rule.name);
        return passed.into();
    }

    pass.resolve(&rule.name, passed);
    let own_target = pass.dispatch.is_sandbox_target(&rule.name);
    if passed {
        let unchanged = pass.previous.get(&rule.name) == Some(&true);
        if rule.toggle && unchanged && !own_target {
            debug!("Rule {} still passing, events suppressed", rule.name);
        } else if pass.dispatch.emit(&rule.events, &pass.facts) {
            pass.set_exit();
        }
    } else if own_target {
        pass.set_exit();
    }
    passed.into()
}
