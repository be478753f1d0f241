use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::pass::Pass;
use super::{scheduler, watchdog, PassMode, RulesEngine};
use crate::event::{Dispatch, SandboxListener};
use crate::facts::Facts;
use crate::rule::Outcome;

/// Runs a throwaway pass that only listens for `event`. The caller must hold
/// the run queue turn.
pub(super) async fn evaluate(engine: &RulesEngine, event: &str, facts: Option<Facts>) -> Outcome {
    let rules = engine.registry().snapshot();
    let (current_facts, recency) = {
        let state = engine.state();
        (state.facts.clone(), state.recency.clone())
    };
    let facts = facts.unwrap_or(current_facts);

    // an auto-generated event belongs to the rule of the same name
    let promoted = (engine.events().is_auto_generated(event) && rules.get(event).is_some())
        .then_some(event);
    let schedule = scheduler::schedule(&rules, &recency, promoted);

    let (listener, mut fired) = SandboxListener::new(event);
    let pass = Arc::new(Pass::new(
        PassMode::Evaluate,
        facts,
        rules,
        schedule,
        HashMap::new(),
        HashMap::new(),
        Dispatch::Sandbox(Arc::new(listener)),
        engine.config().async_timeout,
    ));

    let status = watchdog::guard_pass(
        engine.config().engine_timeout,
        scheduler::run_pass(pass.clone()),
    )
    .await;
    pass.finish();

    let outcome = Outcome::from(fired.try_recv().is_ok());
    debug!("Sandbox evaluation of {}: {} ({})", event, outcome, status);
    outcome
}
