use std::future::Future;
use std::sync::Arc;

use async_recursion::async_recursion;
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use super::evaluator::evaluate_rule;
use super::pass::{Chain, Pass};
use crate::rule::{ConditionTree, Outcome, RuleError};

/// Resolves a condition tree against the pass.
///
/// `All` evaluates its children concurrently and fails on the first failing
/// child. `Any` is `Not(All(Not child...))`. Leaves go through the rule
/// evaluator; an unknown rule fails and a rule already on `chain` fails with a
/// cycle warning.
#[async_recursion]
pub(crate) async fn evaluate_conditions(
    pass: &Arc<Pass>,
    tree: &ConditionTree,
    chain: &Chain,
) -> Outcome {
    if pass.should_exit() {
        return Outcome::Pass;
    }
    match tree {
        ConditionTree::All(children) => {
            all_pass(
                children
                    .iter()
                    .map(|child| evaluate_conditions(pass, child, chain)),
            )
            .await
        }
        ConditionTree::Any(children) => {
            !all_pass(
                children
                    .iter()
                    .map(|child| async move { !evaluate_conditions(pass, child, chain).await }),
            )
            .await
        }
        ConditionTree::Leaf { rule, negated } => {
            let outcome = match pass.rules.get(rule) {
                None => {
                    debug!("Condition references unknown rule: {}", rule);
                    Outcome::Fail
                }
                Some(_) if chain.contains(rule) => {
                    let e = RuleError::CyclicDependency {
                        chain: chain.cycle_to(rule),
                    };
                    warn!("{}", e);
                    Outcome::Fail
                }
                Some(target) => evaluate_rule(pass, target, chain).await,
            };
            if *negated {
                !outcome
            } else {
                outcome
            }
        }
    }
}

async fn all_pass<I, F>(children: I) -> Outcome
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Outcome>,
{
    let mut pending: FuturesUnordered<F> = children.into_iter().collect();
    while let Some(outcome) = pending.next().await {
        if outcome.is_fail() {
            return Outcome::Fail;
        }
    }
    Outcome::Pass
}
