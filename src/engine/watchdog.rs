use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, error};

use super::PassStatus;
use crate::facts::Facts;
use crate::rule::{RegisteredRule, RuleError};

/// Runs a rule's test on its own task, bounded by `limit`.
///
/// Errors, panics and timeouts all count as a failed test. On timeout the
/// task is left running; its result is simply never read.
pub(crate) async fn run_test(rule: &RegisteredRule, facts: &Facts, limit: Duration) -> bool {
    let test = rule.test.clone();
    let facts = facts.clone();
    let handle = tokio::spawn(async move { test.evaluate(&facts).await });

    match timeout(limit, handle).await {
        Ok(Ok(Ok(passed))) => {
            debug!("Rule {} test returned {}", rule.name, passed);
            passed
        }
        Ok(Ok(Err(e))) => {
            error!("Rule {}: {}", rule.name, e);
            false
        }
        Ok(Err(join_error)) => {
            let e = RuleError::Panicked {
                rule: rule.name.clone(),
            };
            error!("{} ({})", e, join_error);
            false
        }
        Err(_) => {
            let e = RuleError::Timeout {
                rule: rule.name.clone(),
                timeout_ms: limit.as_millis() as u64,
            };
            error!("{}", e);
            false
        }
    }
}

/// Bounds a whole pass.
pub(crate) async fn guard_pass<F>(limit: Duration, pass: F) -> PassStatus
where
    F: Future<Output = ()>,
{
    match timeout(limit, pass).await {
        Ok(()) => PassStatus::Completed,
        Err(_) => {
            error!("Pass timed out after {}ms", limit.as_millis());
            PassStatus::TimedOut
        }
    }
}
