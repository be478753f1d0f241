use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, error};

use crate::facts::Facts;

/// Callback bound to an event.
pub type Handler = Arc<dyn Fn(&Facts) + Send + Sync>;

#[derive(Clone, Default)]
struct EventEntry {
    // (handler name, callback), in binding order
    bound: Vec<(String, Handler)>,
    auto_generated: bool,
    // created by binding a handler, still claimable by a rule of the same name
    implicit: bool,
}

#[derive(Default)]
pub struct EventRegistry {
    events: DashMap<String, EventEntry>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)creates an event with no handlers.
    pub fn add_event(&self, name: &str) {
        self.events.insert(name.to_string(), EventEntry::default());
        debug!("Event added: {}", name);
    }

    /// Creates the event if missing; existing handlers are kept.
    pub fn ensure_event(&self, name: &str) {
        self.events.entry(name.to_string()).or_default().implicit = false;
    }

    /// Creates a rule's own event unless the name was registered explicitly.
    /// An event that only exists because a handler was bound to it is claimed
    /// with its handlers.
    pub fn ensure_auto_event(&self, name: &str) {
        let mut entry = self.events.entry(name.to_string()).or_insert_with(|| EventEntry {
            implicit: true,
            ..EventEntry::default()
        });
        if entry.implicit {
            entry.implicit = false;
            entry.auto_generated = true;
        }
    }

    pub fn remove_event(&self, name: &str) -> bool {
        let removed = self.events.remove(name).is_some();
        if removed {
            debug!("Event removed: {}", name);
        }
        removed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.events.contains_key(name)
    }

    pub fn is_auto_generated(&self, name: &str) -> bool {
        self.events
            .get(name)
            .is_some_and(|entry| entry.auto_generated)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.events.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn handler_count(&self, name: &str) -> usize {
        self.events.get(name).map_or(0, |entry| entry.bound.len())
    }

    /// Binds a handler, creating the event when needed. Binding the same
    /// handler name again replaces the callback in place.
    pub fn on<F>(&self, event: &str, handler: &str, callback: F)
    where
        F: Fn(&Facts) + Send + Sync + 'static,
    {
        self.on_handler(event, handler, Arc::new(callback));
    }

    pub fn on_handler(&self, event: &str, handler: &str, callback: Handler) {
        let mut entry = self
            .events
            .entry(event.to_string())
            .or_insert_with(|| EventEntry {
                implicit: true,
                ..EventEntry::default()
            });
        match entry.bound.iter_mut().find(|(name, _)| name == handler) {
            Some(slot) => slot.1 = callback,
            None => entry.bound.push((handler.to_string(), callback)),
        }
        debug!("Handler {} bound to {}", handler, event);
    }

    /// Unbinds one handler, or all of them when `handler` is `None`.
    pub fn off(&self, event: &str, handler: Option<&str>) {
        if let Some(mut entry) = self.events.get_mut(event) {
            match handler {
                Some(handler) => entry.bound.retain(|(name, _)| name != handler),
                None => entry.bound.clear(),
            }
        }
    }

    /// Calls every handler bound to `event`. A panicking handler is logged and
    /// does not stop the others. Returns the number of handlers called.
    pub fn emit(&self, event: &str, facts: &Facts) -> usize {
        // handlers are cloned out so a callback may rebind without deadlocking the map
        let handlers: Vec<(String, Handler)> = match self.events.get(event) {
            Some(entry) => entry.bound.clone(),
            None => return 0,
        };
        for (name, handler) in &handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(facts))).is_err() {
                error!("Handler {} for event {} panicked", name, event);
            }
        }
        debug!("Event emitted: {} ({} handlers)", event, handlers.len());
        handlers.len()
    }
}

impl std::fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("events", &self.names())
            .finish()
    }
}
