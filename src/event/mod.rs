//! # Events
//!
//! An event is a named set of bound handlers. Every rule owns one event named
//! after itself, created automatically at registration unless the caller
//! already registered that name, and may list further events to fire when it
//! passes.
//!
//! ## Dispatch
//!
//! ```text
//! ┌──────────┐ pass  ┌──────────┐  live    ┌─────────────┐
//! │   Rule   │──────▶│ Dispatch │─────────▶│EventRegistry│──▶ handlers
//! └──────────┘       └────┬─────┘          └─────────────┘
//!                         │ sandbox
//!                    ┌────▼───────────┐
//!                    │SandboxListener │──▶ oneshot (target only)
//!                    └────────────────┘
//! ```
//!
//! A live pass calls the real handlers. A sandbox pass only notifies the
//! one-shot listener bound to the event under test; real handlers never run.
//!
//! ## Binding a Handler
//!
//! ```rust,no_run
//! # use rulecast::event::EventRegistry;
//! # use rulecast::facts::Facts;
//! let events = EventRegistry::new();
//! events.on("door_open", "log", |facts: &Facts| {
//!     println!("door opened: {:?}", facts.get("door.id"));
//! });
//! events.emit("door_open", &Facts::empty());
//! events.off("door_open", Some("log"));
//! ```

pub mod dispatcher;
pub mod registry;

pub use dispatcher::{Dispatch, SandboxListener};
pub use registry::{EventRegistry, Handler};
