//! # Rules Engine
//!
//! [`RulesEngine`] owns the fact snapshot, the rule and event registries and
//! the results of the last pass. Every `update_facts`, `run` and `evaluate`
//! call goes through a FIFO queue so exactly one pass is active at a time.
//!
//! ## Pass Lifecycle
//!
//! ```text
//! ┌────────┐   ┌──────────┐   ┌───────────┐   ┌───────────┐   ┌────────┐
//! │ queue  │──▶│ snapshot │──▶│ schedule  │──▶│ evaluate  │──▶│ commit │
//! │ (turn) │   │  state   │   │ prio/rec. │   │ + emit    │   │ result │
//! └────────┘   └──────────┘   └───────────┘   └───────────┘   └────────┘
//! ```
//!
//! A pass works on its own copy of everything it reads and writes. Only a
//! live pass (`update_facts` or `run`) commits back; a sandbox pass started by
//! `evaluate` is discarded whatever happens. A pass that has started runs on
//! its own task and always reaches its commit, so dropping the call never
//! leaves new facts next to results of the old ones.
//!
//! ## Usage
//!
//! ```rust,no_run
//! # use rulecast::{Rule, RulesEngine};
//! # use serde_json::json;
//! # async fn example() {
//! let engine = RulesEngine::default();
//! engine.add_rule(Rule::new("hot").test(|facts| {
//!     facts.get("temp").and_then(|t| t.as_f64()).unwrap_or(0.0) > 30.0
//! }));
//! engine.on("hot", "fan", |_| println!("fan on"));
//!
//! engine.update_facts(json!({ "temp": 35 })).await;
//! let would_fire = engine.evaluate("hot", Some(json!({ "temp": 10 }).into())).await;
//! # }
//! ```

mod condition;
mod evaluator;
mod pass;
mod queue;
mod sandbox;
mod scheduler;
mod watchdog;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, error, info, Instrument};

use crate::config::EngineConfig;
use crate::event::{Dispatch, EventRegistry};
use crate::facts::Facts;
use crate::rule::{Outcome, Rule, RuleRegistry};
use crate::timestamp::Timestamp;
use pass::{lock, Pass, PassResult};
use queue::RunQueue;

/// How a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum PassStatus {
    Completed,
    TimedOut,
}

/// Which call started a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum PassMode {
    UpdateFacts,
    Run,
    Evaluate,
}

/// Engine state carried from one pass to the next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineSnapshot {
    pub facts: Facts,
    /// Resolved outcomes of the last completed pass.
    pub evaluated: HashMap<String, bool>,
    /// Outcomes the last pass compared against.
    pub previous: HashMap<String, bool>,
    pub recency: HashMap<String, Timestamp>,
}

struct EngineInner {
    config: EngineConfig,
    registry: Mutex<RuleRegistry>,
    events: Arc<EventRegistry>,
    state: Mutex<EngineSnapshot>,
    queue: Arc<RunQueue>,
}

/// Cloneable handle to a rules engine.
#[derive(Clone)]
pub struct RulesEngine {
    inner: Arc<EngineInner>,
}

impl Default for RulesEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for RulesEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RulesEngine")
            .field("config", &self.inner.config)
            .field("rules", &self.rule_names())
            .field("events", &self.inner.events)
            .finish()
    }
}

impl RulesEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                config,
                registry: Mutex::new(RuleRegistry::new()),
                events: Arc::new(EventRegistry::new()),
                state: Mutex::new(EngineSnapshot::default()),
                queue: Arc::new(RunQueue::new()),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Replaces the fact snapshot and runs a pass from a clean cache.
    #[tracing::instrument(skip_all, level = "debug")]
    pub async fn update_facts(&self, facts: impl Into<Facts>) -> PassStatus {
        let facts = facts.into();
        self.in_turn(PassStatus::TimedOut, move |engine| async move {
            engine.state().facts = facts;
            engine.live_pass(PassMode::UpdateFacts).await
        })
        .await
    }

    /// Runs a pass over the current facts, reusing last pass results. Only
    /// rules added or replaced since then are evaluated.
    #[tracing::instrument(skip_all, level = "debug")]
    pub async fn run(&self) -> PassStatus {
        self.in_turn(PassStatus::TimedOut, |engine| async move {
            engine.live_pass(PassMode::Run).await
        })
        .await
    }

    /// Answers whether `event` would fire for `facts` (or the current facts
    /// when `None`) without calling real handlers or changing engine state.
    #[tracing::instrument(skip(self, facts), level = "debug")]
    pub async fn evaluate(&self, event: &str, facts: Option<Facts>) -> Outcome {
        let event = event.to_string();
        self.in_turn(Outcome::Fail, move |engine| async move {
            sandbox::evaluate(&engine, &event, facts).await
        })
        .await
    }

    /// Waits for the queue, then runs the pass on its own task. Once the turn
    /// has come the pass always runs to its commit, even if the caller stops
    /// waiting for it.
    async fn in_turn<F, Fut, T>(&self, fallback: T, pass: F) -> T
    where
        F: FnOnce(RulesEngine) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let turn = self.inner.queue.acquire().await;
        let pass = pass(self.clone());
        let task = tokio::spawn(
            async move {
                let _turn = turn;
                pass.await
            }
            .in_current_span(),
        );
        match task.await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                error!("Pass task did not finish: {}", err);
                fallback
            }
        }
    }

    async fn live_pass(&self, mode: PassMode) -> PassStatus {
        let rules = self.registry().snapshot();
        let (facts, seed, previous, recency) = {
            let state = self.state();
            let seed = match mode {
                PassMode::Run => state.evaluated.clone(),
                _ => HashMap::new(),
            };
            (
                state.facts.clone(),
                seed,
                state.evaluated.clone(),
                state.recency.clone(),
            )
        };
        let schedule = scheduler::schedule(&rules, &recency, None);
        let pass = Arc::new(Pass::new(
            mode,
            facts,
            rules,
            schedule,
            seed,
            previous,
            Dispatch::Live(self.inner.events.clone()),
            self.inner.config.async_timeout,
        ));

        let status = watchdog::guard_pass(
            self.inner.config.engine_timeout,
            scheduler::run_pass(pass.clone()),
        )
        .await;
        let result = pass.finish();
        self.commit(&pass, result, status);
        info!("{} pass {}", mode, status);
        status
    }

    fn commit(&self, pass: &Pass, result: PassResult, status: PassStatus) {
        let registry = self.registry();
        // rules replaced or removed while the pass ran keep their reset state
        let current = |name: &String| {
            match (registry.get(name), pass.rules.get(name)) {
                (Some(now), Some(then)) => Arc::ptr_eq(&now, then),
                _ => false,
            }
        };
        let mut state = self.state();
        state.evaluated = match status {
            PassStatus::Completed => result
                .resolved
                .into_iter()
                .filter(|(name, _)| current(name))
                .collect(),
            PassStatus::TimedOut => HashMap::new(),
        };
        state.previous = pass
            .previous
            .iter()
            .filter(|(name, _)| current(*name))
            .map(|(name, value)| (name.clone(), *value))
            .collect();
        for (name, stamp) in result.recency {
            if !current(&name) {
                continue;
            }
            let entry = state.recency.entry(name).or_insert(stamp);
            *entry = (*entry).max(stamp);
        }
    }

    /// Registers or replaces a rule and creates its events.
    pub fn add_rule(&self, rule: Rule) {
        let registered = self.registry().insert(rule, &self.inner.config);
        for event in registered.explicit_events() {
            self.inner.events.ensure_event(event);
        }
        self.inner.events.ensure_auto_event(&registered.name);

        let mut state = self.state();
        state.evaluated.remove(&registered.name);
        state.previous.remove(&registered.name);
        state
            .recency
            .insert(registered.name.clone(), Timestamp::now());
    }

    pub fn add_rules<I>(&self, rules: I)
    where
        I: IntoIterator<Item = Rule>,
    {
        for rule in rules {
            self.add_rule(rule);
        }
    }

    /// Removes a rule, and its own event when that event was created for it.
    pub fn remove_rule(&self, name: &str) -> bool {
        if self.registry().remove(name).is_none() {
            debug!("No rule to remove: {}", name);
            return false;
        }
        if self.inner.events.is_auto_generated(name) {
            self.inner.events.remove_event(name);
        }
        let mut state = self.state();
        state.evaluated.remove(name);
        state.previous.remove(name);
        state.recency.remove(name);
        true
    }

    /// Registered rule names in registration order.
    pub fn rule_names(&self) -> Vec<String> {
        self.registry().names()
    }

    /// (Re)creates an event with no handlers.
    pub fn add_event(&self, name: &str) {
        self.inner.events.add_event(name);
    }

    pub fn add_events<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.add_event(name.as_ref());
        }
    }

    pub fn remove_event(&self, name: &str) -> bool {
        self.inner.events.remove_event(name)
    }

    pub fn event_names(&self) -> Vec<String> {
        self.inner.events.names()
    }

    pub fn events(&self) -> &Arc<EventRegistry> {
        &self.inner.events
    }

    pub fn on<F>(&self, event: &str, handler: &str, callback: F)
    where
        F: Fn(&Facts) + Send + Sync + 'static,
    {
        self.inner.events.on(event, handler, callback);
    }

    pub fn off(&self, event: &str, handler: Option<&str>) {
        self.inner.events.off(event, handler);
    }

    /// Deep copy of the facts, or of the value at a dot path.
    pub fn get_facts(&self, path: Option<&str>) -> Option<Value> {
        let state = self.state();
        match path {
            Some(path) => state.facts.get(path).cloned(),
            None => Some(state.facts.to_value()),
        }
    }

    /// Calls waiting behind the active pass.
    pub fn queued(&self) -> usize {
        self.inner.queue.queued()
    }

    pub fn is_running(&self) -> bool {
        self.inner.queue.is_running()
    }

    pub fn snapshot(&self) -> EngineSnapshot {
        self.state().clone()
    }

    fn registry(&self) -> MutexGuard<'_, RuleRegistry> {
        lock(&self.inner.registry)
    }

    fn state(&self) -> MutexGuard<'_, EngineSnapshot> {
        lock(&self.inner.state)
    }
}
