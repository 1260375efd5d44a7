//! Names of the bookkeeping events the dispatcher emits about itself.
//!
//! These are always dispatched through the synchronous path and their
//! listeners' cancel results are ignored.

/// Emitted with `(event_name, listener)` before a listener is registered.
pub const NEW_LISTENER: &str = "newListener";

/// Emitted with `(event_name, listener)` after a listener is removed.
pub const REMOVE_LISTENER: &str = "removeListener";

/// Emitted with `(event_name, count)` when an event passes the listener limit.
pub const MAX_LISTENERS_PASSED: &str = "maxListenersPassed";

/// Check if `name` is one of the dispatcher's bookkeeping events.
pub fn is_meta_event(name: &str) -> bool {
    matches!(name, NEW_LISTENER | REMOVE_LISTENER | MAX_LISTENERS_PASSED)
}
