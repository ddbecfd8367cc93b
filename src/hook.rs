//! Notification hook: a minimal synchronous observer registry.
//!
//! The dispatcher fires an event after every invocation, the executor fires
//! its own event on the designated thread, and shutdown fires a terminal
//! event. Handlers run synchronously on the firing thread, in connection
//! order. A misbehaving handler is logged and swallowed so one bad observer
//! cannot break dispatch.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

/// Kinds of events observers can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A command finished dispatching, successfully or not.
    Command,
    /// The executor thread finished invoking a command.
    Executed,
    /// The server's running flag flipped false.
    Terminated,
}

/// Payload passed to every connected handler.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub command: String,
    pub parameters: Map<String, Value>,
    pub success: bool,
}

impl Event {
    pub fn command(name: impl Into<String>, parameters: Map<String, Value>, success: bool) -> Self {
        Self {
            kind: EventKind::Command,
            command: name.into(),
            parameters,
            success,
        }
    }

    pub fn executed(name: impl Into<String>, parameters: Map<String, Value>, success: bool) -> Self {
        Self {
            kind: EventKind::Executed,
            command: name.into(),
            parameters,
            success,
        }
    }

    pub fn terminated() -> Self {
        Self {
            kind: EventKind::Terminated,
            command: String::new(),
            parameters: Map::new(),
            success: true,
        }
    }
}

type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Observer registry. Cheap to share behind the server context.
#[derive(Default)]
pub struct EventHub {
    handlers: Mutex<Vec<(EventKind, EventHandler)>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a handler to one event kind. Handlers fire in connection
    /// order, on the thread that calls [`fire`](Self::fire).
    pub fn connect<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.handlers.lock().push((kind, Arc::new(handler)));
    }

    /// Invoke every handler connected to `event.kind`. Handler panics are
    /// caught and logged, never propagated.
    ///
    /// Handlers run outside the registry lock, so a handler may connect
    /// further handlers or fire events on this hub; handlers connected
    /// mid-fire only see subsequent events.
    pub fn fire(&self, event: &Event) {
        let matching: Vec<EventHandler> = self
            .handlers
            .lock()
            .iter()
            .filter(|(kind, _)| *kind == event.kind)
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in matching {
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                tracing::warn!(
                    kind = ?event.kind,
                    command = %event.command,
                    "event handler panicked"
                );
            }
        }
    }
}
