//! # rulecast: Event-Firing Rules Engine
//!
//! rulecast evaluates a set of named, prioritized boolean rules against a
//! shared fact snapshot and fires events when rules become true.
//!
//! ## Building Blocks
//!
//! - Facts: an immutable JSON snapshot replaced wholesale ([`facts`])
//! - Rules: async predicates with priorities, toggles and condition trees
//!   over other rules ([`rule`])
//! - Events: named handler sets, one created per rule ([`event`])
//! - Engine: the scheduler, memoizing evaluator, run queue, sandbox and
//!   watchdog tying it together ([`engine`])
//!
//! ## Evaluation Pipeline
//!
//! ```text
//! update_facts / run / evaluate
//!          │
//!     ┌────▼────┐    ┌───────────┐    ┌────────────┐    ┌──────────┐
//!     │RunQueue │───▶│ Scheduler │───▶│ Evaluator  │───▶│ Dispatch │
//!     └─────────┘    └───────────┘    └─────┬──────┘    └──────────┘
//!                                           │ conditions
//!                                     ┌─────▼──────┐
//!                                     │ All/Any/Not│
//!                                     └────────────┘
//! ```
//!
//! Rules are ordered by priority (lowest first), then by how recently their
//! outcome last changed. Each rule runs at most once per pass; condition trees
//! pull their dependencies forward and share the in-flight result.
//!
//! ### Toggle Mode
//!
//! A toggled rule (the default) fires its events only when it turns true, not
//! on every pass where it stays true.
//!
//! ### Sandbox Evaluation
//!
//! [`RulesEngine::evaluate`] asks whether an event would fire for a given set
//! of facts. It runs a separate pass that never calls real handlers and never
//! touches engine state.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod facts;
pub mod rule;
pub mod timestamp;

// Re-exports
pub use config::EngineConfig;
pub use engine::{EngineSnapshot, PassMode, PassStatus, RulesEngine};
pub use error::*;
pub use facts::Facts;
pub use rule::{ConditionTree, Outcome, Rule, RuleError, RuleResult, RuleTest};
