//! Ordered listener sequences keyed by event name.

use crate::listener::Listener;
use std::collections::HashMap;

/// Map from event name to listeners in insertion order.
///
/// A key is only present while its sequence is non-empty, so "absent" and
/// "empty" are the same state.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    events: HashMap<String, Vec<Listener>>,
}

impl ListenerRegistry {
    /// Append `listener` to the tail of `event`'s sequence.
    pub(crate) fn append(&mut self, event: &str, listener: Listener) {
        self.events
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    pub(crate) fn contains(&self, event: &str) -> bool {
        self.events.contains_key(event)
    }

    pub(crate) fn len(&self, event: &str) -> usize {
        self.events.get(event).map_or(0, Vec::len)
    }

    /// Copy of `event`'s sequence.
    pub(crate) fn snapshot(&self, event: &str) -> Vec<Listener> {
        self.events.get(event).cloned().unwrap_or_default()
    }

    /// Remove the first registration of `listener` for `event`.
    ///
    /// Returns `false` if it was not registered.
    pub(crate) fn remove_first(&mut self, event: &str, listener: &Listener) -> bool {
        let Some(listeners) = self.events.get_mut(event) else {
            return false;
        };
        let Some(idx) = listeners.iter().position(|l| l.ptr_eq(listener)) else {
            return false;
        };
        listeners.remove(idx);
        if listeners.is_empty() {
            self.events.remove(event);
        }
        true
    }

    /// Remove and return every listener for `event`.
    pub(crate) fn take(&mut self, event: &str) -> Vec<Listener> {
        self.events.remove(event).unwrap_or_default()
    }

    pub(crate) fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }
}
