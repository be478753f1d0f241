//! Adapters that turn plain closures and declarative checks into [`RuleTest`]s.
//!
//! The shape of a test is decided once, when the rule is built, so the
//! evaluator only ever sees the one async trait.

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use super::{RuleResult, RuleTest};
use crate::facts::{is_truthy, Facts};

/// Synchronous boolean predicate.
pub struct FnTest<F>(pub F);

#[async_trait]
impl<F> RuleTest for FnTest<F>
where
    F: Fn(&Facts) -> bool + Send + Sync,
{
    async fn evaluate(&self, facts: &Facts) -> RuleResult<bool> {
        Ok((self.0)(facts))
    }
}

/// Synchronous predicate that may fail.
pub struct TryFnTest<F>(pub F);

#[async_trait]
impl<F> RuleTest for TryFnTest<F>
where
    F: Fn(&Facts) -> RuleResult<bool> + Send + Sync,
{
    async fn evaluate(&self, facts: &Facts) -> RuleResult<bool> {
        (self.0)(facts)
    }
}

/// Asynchronous predicate. The closure receives its own handle to the snapshot.
pub struct AsyncFnTest<F>(pub F);

#[async_trait]
impl<F, Fut> RuleTest for AsyncFnTest<F>
where
    F: Fn(Facts) -> Fut + Send + Sync,
    Fut: Future<Output = RuleResult<bool>> + Send + 'static,
{
    async fn evaluate(&self, facts: &Facts) -> RuleResult<bool> {
        (self.0)(facts.clone()).await
    }
}

/// Stand-in for a rule registered without a test.
pub struct AlwaysPass;

#[async_trait]
impl RuleTest for AlwaysPass {
    async fn evaluate(&self, _facts: &Facts) -> RuleResult<bool> {
        Ok(true)
    }
}

/// Declarative check used by rule files: the value at `path` must equal
/// `equals`, or be truthy when no expected value is given.
#[derive(Debug, Clone, PartialEq)]
pub struct FactTest {
    pub path: String,
    pub equals: Option<Value>,
}

impl FactTest {
    pub fn truthy(path: &str) -> Self {
        Self {
            path: path.to_string(),
            equals: None,
        }
    }

    pub fn equals(path: &str, expected: Value) -> Self {
        Self {
            path: path.to_string(),
            equals: Some(expected),
        }
    }
}

#[async_trait]
impl RuleTest for FactTest {
    async fn evaluate(&self, facts: &Facts) -> RuleResult<bool> {
        let actual = facts.get(&self.path);
        Ok(match (&self.equals, actual) {
            (Some(expected), Some(actual)) => expected == actual,
            (Some(Value::Null), None) => true,
            (Some(_), None) => false,
            (None, actual) => actual.is_some_and(is_truthy),
        })
    }
}
