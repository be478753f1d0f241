use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use tracing::debug;

use super::PassMode;
use crate::event::Dispatch;
use crate::facts::Facts;
use crate::rule::{Outcome, RegisteredRule, RuleSnapshot};
use crate::timestamp::Timestamp;

pub(crate) type SharedOutcome = Shared<BoxFuture<'static, Outcome>>;

#[derive(Clone)]
pub(crate) enum CacheEntry {
    Pending(SharedOutcome),
    Resolved(bool),
}

/// Names of the rules on the current evaluation path, outermost first.
#[derive(Debug, Clone, Default)]
pub(crate) struct Chain(Vec<String>);

impl Chain {
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|n| n == name)
    }

    pub fn push(&self, name: &str) -> Chain {
        let mut names = self.0.clone();
        names.push(name.to_string());
        Chain(names)
    }

    /// The cycle closed by stepping back into `name`.
    pub fn cycle_to(&self, name: &str) -> Vec<String> {
        let start = self.0.iter().position(|n| n == name).unwrap_or(0);
        let mut cycle = self.0[start..].to_vec();
        cycle.push(name.to_string());
        cycle
    }
}

/// State owned by a single evaluation pass.
///
/// Nothing here is visible to the engine until the pass is committed, so a
/// late rule test from an abandoned pass can never leak into the next one.
pub(crate) struct Pass {
    pub mode: PassMode,
    pub facts: Facts,
    pub rules: RuleSnapshot,
    pub schedule: Vec<Arc<RegisteredRule>>,
    pub previous: HashMap<String, bool>,
    pub dispatch: Dispatch,
    pub async_timeout: Duration,
    cache: Mutex<HashMap<String, CacheEntry>>,
    recency: Mutex<HashMap<String, Timestamp>>,
    exit: AtomicBool,
    finished: AtomicBool,
}

/// What a finished pass hands back to the engine.
#[derive(Debug, Default)]
pub(crate) struct PassResult {
    pub resolved: HashMap<String, bool>,
    pub recency: HashMap<String, Timestamp>,
}

impl Pass {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mode: PassMode,
        facts: Facts,
        rules: RuleSnapshot,
        schedule: Vec<Arc<RegisteredRule>>,
        seed: HashMap<String, bool>,
        previous: HashMap<String, bool>,
        dispatch: Dispatch,
        async_timeout: Duration,
    ) -> Self {
        let cache = seed
            .into_iter()
            .map(|(name, value)| (name, CacheEntry::Resolved(value)))
            .collect();
        Self {
            mode,
            facts,
            rules,
            schedule,
            previous,
            dispatch,
            async_timeout,
            cache: Mutex::new(cache),
            recency: Mutex::new(HashMap::new()),
            exit: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        }
    }

    pub fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        lock(&self.cache)
    }

    pub fn should_exit(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }

    pub fn set_exit(&self) {
        self.exit.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Records a rule's outcome and stamps its recency when it differs from
    /// the previous pass.
    pub fn resolve(&self, name: &str, passed: bool) {
        lock(&self.cache).insert(name.to_string(), CacheEntry::Resolved(passed));
        if self.previous.get(name) != Some(&passed) {
            let now = Timestamp::now();
            debug!("Rule {} turned {} at {}", name, Outcome::from(passed), now);
            lock(&self.recency).insert(name.to_string(), now);
        }
    }

    /// Ends the pass. Pending evaluations are dropped with the cache, which
    /// also releases the futures that hold a handle back to this pass.
    pub fn finish(&self) -> PassResult {
        self.finished.store(true, Ordering::SeqCst);
        let cache = std::mem::take(&mut *lock(&self.cache));
        let recency = std::mem::take(&mut *lock(&self.recency));
        let resolved = cache
            .into_iter()
            .filter_map(|(name, entry)| match entry {
                CacheEntry::Resolved(value) => Some((name, value)),
                CacheEntry::Pending(_) => None,
            })
            .collect();
        PassResult { resolved, recency }
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
