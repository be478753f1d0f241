use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::debug;

use super::EventRegistry;
use crate::facts::Facts;

/// One-shot listener bound to the event a sandbox pass asks about.
#[derive(Debug)]
pub struct SandboxListener {
    target: String,
    sender: Mutex<Option<oneshot::Sender<()>>>,
}

impl SandboxListener {
    pub fn new(target: &str) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                target: target.to_string(),
                sender: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn targets(&self, event: &str) -> bool {
        self.target == event
    }

    /// Fires once. Returns true when this call fired the listener.
    fn fire(&self) -> bool {
        let sender = match self.sender.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        match sender {
            Some(tx) => {
                // a closed receiver means the sandbox call already returned
                let _ = tx.send(());
                debug!("Sandbox listener fired: {}", self.target);
                true
            }
            None => false,
        }
    }
}

/// Where a pass sends the events of passing rules.
#[derive(Debug, Clone)]
pub enum Dispatch {
    Live(Arc<EventRegistry>),
    Sandbox(Arc<SandboxListener>),
}

impl Dispatch {
    /// The sandbox target, if this pass is a sandbox pass.
    pub fn sandbox_target(&self) -> Option<&str> {
        match self {
            Dispatch::Live(_) => None,
            Dispatch::Sandbox(listener) => Some(listener.target()),
        }
    }

    pub fn is_sandbox_target(&self, event: &str) -> bool {
        self.sandbox_target() == Some(event)
    }

    /// Emits `events` in order. Returns true when the sandbox listener fired,
    /// which ends the pass.
    pub fn emit(&self, events: &[String], facts: &Facts) -> bool {
        match self {
            Dispatch::Live(registry) => {
                for event in events {
                    registry.emit(event, facts);
                }
                false
            }
            Dispatch::Sandbox(listener) => events
                .iter()
                .any(|event| listener.targets(event) && listener.fire()),
        }
    }
}
