//! Declarative rule files.
//!
//! ```json
//! {
//!   "rules": [
//!     { "name": "adult", "fact": "user.age_verified" },
//!     { "name": "vip", "fact": "user.tier", "equals": "gold", "priority": 1 },
//!     { "name": "offer", "toggle": false, "events": "send_offer",
//!       "conditions": { "all": ["adult", "!banned"] } }
//!   ]
//! }
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{ConditionTree, FactTest, Rule, RuleError};
use crate::config;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleFile {
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggle: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<ConditionTree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(event) => vec![event],
            OneOrMany::Many(events) => events,
        }
    }
}

impl From<RuleSpec> for Rule {
    fn from(spec: RuleSpec) -> Self {
        let mut rule = Rule::new(&spec.name);
        if let Some(path) = spec.fact {
            let test = match spec.equals {
                Some(expected) => FactTest::equals(&path, expected),
                None => FactTest::truthy(&path),
            };
            rule = rule.with_test(Arc::new(test));
        }
        if let Some(priority) = spec.priority {
            rule = rule.priority(priority);
        }
        if let Some(toggle) = spec.toggle {
            rule = rule.toggle(toggle);
        }
        if let Some(events) = spec.events {
            rule = rule.events(events.into_vec());
        }
        if let Some(conditions) = spec.conditions {
            rule = rule.conditions(conditions);
        }
        rule
    }
}

impl RuleFile {
    pub fn into_rules(self) -> Result<Vec<Rule>> {
        self.rules
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                if spec.name.trim().is_empty() {
                    return Err(Error::from(RuleError::InvalidDefinition(format!(
                        "rule #{} has no name",
                        index
                    ))));
                }
                Ok(Rule::from(spec))
            })
            .collect()
    }
}

pub fn load_rules<P: AsRef<Path>>(path: P) -> Result<Vec<Rule>> {
    let file: RuleFile = config::from_file(path)?;
    file.into_rules()
}

pub fn parse_rules(s: &str) -> Result<Vec<Rule>> {
    let file: RuleFile = config::from_str(s)?;
    file.into_rules()
}
