use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{ConditionTree, Rule, RuleTest};
use crate::config::EngineConfig;

/// A rule after registration: defaults applied and events normalized.
pub struct RegisteredRule {
    pub name: String,
    pub priority: f64,
    pub toggle: bool,
    /// Explicit events first, the rule's own event last.
    pub events: Vec<String>,
    pub conditions: Option<ConditionTree>,
    pub test: Arc<dyn RuleTest>,
}

impl RegisteredRule {
    pub fn from_rule(rule: Rule, config: &EngineConfig) -> Self {
        let mut events: Vec<String> = Vec::with_capacity(rule.events.len() + 1);
        for event in rule.events {
            if event != rule.name && !events.contains(&event) {
                events.push(event);
            }
        }
        events.push(rule.name.clone());

        Self {
            priority: rule.priority.unwrap_or(config.default_priority),
            toggle: rule.toggle.unwrap_or(config.default_toggle),
            events,
            conditions: rule.conditions,
            test: rule.test,
            name: rule.name,
        }
    }

    /// Events named by the caller, without the self event.
    pub fn explicit_events(&self) -> &[String] {
        &self.events[..self.events.len() - 1]
    }
}

impl std::fmt::Debug for RegisteredRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredRule")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("toggle", &self.toggle)
            .field("events", &self.events)
            .field("conditions", &self.conditions)
            .finish_non_exhaustive()
    }
}

/// Immutable view of the registry taken at the start of a pass.
#[derive(Debug, Clone, Default)]
pub struct RuleSnapshot {
    pub rules: HashMap<String, Arc<RegisteredRule>>,
    pub order: Vec<String>,
}

impl RuleSnapshot {
    pub fn get(&self, name: &str) -> Option<&Arc<RegisteredRule>> {
        self.rules.get(name)
    }

    /// Rules in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RegisteredRule>> {
        self.order.iter().filter_map(|name| self.rules.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RuleRegistry {
    rules: HashMap<String, Arc<RegisteredRule>>,
    order: Vec<String>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a rule. A replaced rule keeps its place in the
    /// registration order.
    pub fn insert(&mut self, rule: Rule, config: &EngineConfig) -> Arc<RegisteredRule> {
        let registered = Arc::new(RegisteredRule::from_rule(rule, config));
        let name = registered.name.clone();
        if self
            .rules
            .insert(name.clone(), registered.clone())
            .is_some()
        {
            debug!("Replaced rule: {}", name);
        } else {
            debug!("Registered rule: {}", name);
            self.order.push(name);
        }
        registered
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<RegisteredRule>> {
        let removed = self.rules.remove(name)?;
        self.order.retain(|n| n != name);
        debug!("Removed rule: {}", name);
        Some(removed)
    }

    pub fn get(&self, name: &str) -> Option<Arc<RegisteredRule>> {
        self.rules.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn snapshot(&self) -> RuleSnapshot {
        RuleSnapshot {
            rules: self.rules.clone(),
            order: self.order.clone(),
        }
    }
}
