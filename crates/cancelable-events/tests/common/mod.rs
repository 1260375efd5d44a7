//! Shared helpers for dispatcher integration tests.

#![allow(dead_code)]

use cancelable_events::{Arg, DiagnosticSink, Listener};
use parking_lot::Mutex;
use std::sync::Arc;

/// Install a fmt subscriber once so `RUST_LOG` works while debugging tests.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// Ordered record of which listeners ran.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    /// Synchronous listener that records `name` and continues.
    pub fn recorder(&self, name: &str) -> Listener {
        let log = self.clone();
        let name = name.to_string();
        Listener::sync(move |_: &[Arg]| log.push(name.clone()))
    }

    /// Synchronous listener that records `name` and cancels.
    pub fn canceler(&self, name: &str) -> Listener {
        let log = self.clone();
        let name = name.to_string();
        Listener::sync(move |_: &[Arg]| {
            log.push(name.clone());
            false
        })
    }

    /// Suspending listener that yields before recording `name`.
    pub fn suspending_recorder(&self, name: &str) -> Listener {
        let log = self.clone();
        let name = name.to_string();
        Listener::suspending(move |_: Vec<Arg>| {
            let log = log.clone();
            let name = name.clone();
            async move {
                tokio::task::yield_now().await;
                log.push(name);
            }
        })
    }
}

/// Diagnostic sink that keeps every warning in memory.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn warn(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

/// Listener that records `(event_name, listener)` pairs of a meta-event.
pub fn meta_recorder(seen: &Arc<Mutex<Vec<(String, Option<Listener>)>>>) -> Listener {
    let seen = Arc::clone(seen);
    Listener::sync(move |args: &[Arg]| {
        let event = args[0].as_str().unwrap_or_default().to_string();
        let listener = args.get(1).and_then(Arg::as_listener).cloned();
        seen.lock().push((event, listener));
    })
}
