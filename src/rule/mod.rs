//! # Rules
//!
//! A rule is a named, prioritized predicate over the fact snapshot. It may carry
//! a [`ConditionTree`] over other rules that must hold before its own test runs,
//! and a list of events fired when it passes.
//!
//! ```rust,no_run
//! # use rulecast::rule::{ConditionTree, Rule};
//! let rule = Rule::new("checkout_allowed")
//!     .test(|facts| facts.is_truthy("cart.items"))
//!     .priority(1.0)
//!     .toggle(false)
//!     .events(["notify_checkout"])
//!     .conditions(ConditionTree::all(["logged_in", "!banned"]));
//! ```

pub mod adapter;
pub mod condition;
pub mod file;
pub mod registry;

use std::future::Future;
use std::ops::Not;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use adapter::{AlwaysPass, AsyncFnTest, FactTest, FnTest, TryFnTest};
pub use condition::ConditionTree;
pub use registry::{RegisteredRule, RuleRegistry, RuleSnapshot};

use crate::facts::Facts;

/// Result of evaluating a rule or a condition tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
}

impl Outcome {
    pub fn is_pass(self) -> bool {
        matches!(self, Outcome::Pass)
    }

    pub fn is_fail(self) -> bool {
        matches!(self, Outcome::Fail)
    }
}

impl Not for Outcome {
    type Output = Outcome;

    fn not(self) -> Self::Output {
        match self {
            Outcome::Pass => Outcome::Fail,
            Outcome::Fail => Outcome::Pass,
        }
    }
}

impl From<bool> for Outcome {
    fn from(passed: bool) -> Self {
        if passed {
            Outcome::Pass
        } else {
            Outcome::Fail
        }
    }
}

impl From<Outcome> for bool {
    fn from(outcome: Outcome) -> Self {
        outcome.is_pass()
    }
}

/// The single capability the evaluator needs from a rule.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleTest: Send + Sync {
    async fn evaluate(&self, facts: &Facts) -> RuleResult<bool>;
}

/// Rule definition as supplied by the caller.
///
/// `priority` and `toggle` fall back to the engine configuration when unset.
#[derive(Clone)]
pub struct Rule {
    pub name: String,
    pub priority: Option<f64>,
    pub toggle: Option<bool>,
    pub events: Vec<String>,
    pub conditions: Option<ConditionTree>,
    pub test: Arc<dyn RuleTest>,
}

impl Rule {
    /// A rule with no test passes whenever its conditions do.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            priority: None,
            toggle: None,
            events: Vec::new(),
            conditions: None,
            test: Arc::new(AlwaysPass),
        }
    }

    pub fn test<F>(self, test: F) -> Self
    where
        F: Fn(&Facts) -> bool + Send + Sync + 'static,
    {
        self.with_test(Arc::new(FnTest(test)))
    }

    pub fn try_test<F>(self, test: F) -> Self
    where
        F: Fn(&Facts) -> RuleResult<bool> + Send + Sync + 'static,
    {
        self.with_test(Arc::new(TryFnTest(test)))
    }

    pub fn async_test<F, Fut>(self, test: F) -> Self
    where
        F: Fn(Facts) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RuleResult<bool>> + Send + 'static,
    {
        self.with_test(Arc::new(AsyncFnTest(test)))
    }

    pub fn with_test(mut self, test: Arc<dyn RuleTest>) -> Self {
        self.test = test;
        self
    }

    pub fn priority(mut self, priority: f64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn toggle(mut self, toggle: bool) -> Self {
        self.toggle = Some(toggle);
        self
    }

    pub fn event(mut self, event: &str) -> Self {
        self.events.push(event.to_string());
        self
    }

    pub fn events<I, S>(mut self, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.events.extend(events.into_iter().map(Into::into));
        self
    }

    pub fn conditions(mut self, conditions: impl Into<ConditionTree>) -> Self {
        self.conditions = Some(conditions.into());
        self
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("toggle", &self.toggle)
            .field("events", &self.events)
            .field("conditions", &self.conditions)
            .finish_non_exhaustive()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error("Rule test failed: {0}")]
    TestFailed(String),
    #[error("Timed out for evaluation of rule {rule} after {timeout_ms}ms")]
    Timeout { rule: String, timeout_ms: u64 },
    #[error("Rule test panicked: {rule}")]
    Panicked { rule: String },
    #[error("Cyclic dependency: {}", chain.join(" -> "))]
    CyclicDependency { chain: Vec<String> },
    #[error("Invalid rule definition: {0}")]
    InvalidDefinition(String),
}

impl RuleError {
    pub fn failed<S: Into<String>>(message: S) -> Self {
        RuleError::TestFailed(message.into())
    }
}

pub type RuleResult<T> = Result<T, RuleError>;
