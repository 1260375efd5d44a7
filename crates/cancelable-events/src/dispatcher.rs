//! The dispatcher: listener registration and both dispatch paths.
//!
//! # Ordering
//!
//! Each emission builds a call list from the registries before invoking
//! anything: one-shot listeners first, then persistent listeners, each group
//! in insertion order. Listeners added or removed while the emission runs do
//! not change that call list.
//!
//! # Locking
//!
//! The registries sit behind a `parking_lot::Mutex` that is only held while
//! snapshotting or mutating them, never while a listener runs. Listeners may
//! therefore call back into the same dispatcher (`on`, `off`, `emit`, ...)
//! without deadlocking.
//!
//! # Errors
//!
//! Listener errors are not isolated: the first failure aborts the emission
//! and is returned to the caller wrapped in [`EmitError::ListenerFault`].

use crate::config::{DispatcherConfig, DEFAULT_MAX_LISTENERS};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::{EmitError, EmitResult};
use crate::listener::{Arg, Listener, ListenerFuture, Propagation, Reply};
use crate::meta::{is_meta_event, MAX_LISTENERS_PASSED, NEW_LISTENER, REMOVE_LISTENER};
use crate::outcome::EmitOutcome;
use crate::registry::ListenerRegistry;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifetime {
    Persistent,
    Once,
}

/// One step of an emission's call list.
struct CallEntry {
    listener: Listener,
    lifetime: Lifetime,
}

#[derive(Default)]
struct Registries {
    persistent: ListenerRegistry,
    once: ListenerRegistry,
    /// Events whose `maxListenersPassed` has fired for the current crossing.
    warned: HashSet<String>,
}

impl Registries {
    fn registry_mut(&mut self, lifetime: Lifetime) -> &mut ListenerRegistry {
        match lifetime {
            Lifetime::Persistent => &mut self.persistent,
            Lifetime::Once => &mut self.once,
        }
    }

    fn count(&self, event: &str) -> usize {
        self.persistent.len(event) + self.once.len(event)
    }

    fn call_list(&self, event: &str) -> Option<Vec<CallEntry>> {
        if !self.once.contains(event) && !self.persistent.contains(event) {
            return None;
        }
        let once = self
            .once
            .snapshot(event)
            .into_iter()
            .map(|listener| CallEntry {
                listener,
                lifetime: Lifetime::Once,
            });
        let persistent = self
            .persistent
            .snapshot(event)
            .into_iter()
            .map(|listener| CallEntry {
                listener,
                lifetime: Lifetime::Persistent,
            });
        Some(once.chain(persistent).collect())
    }

    /// Allow the warning to fire again once `event` is back under the limit.
    fn rearm_warning(&mut self, event: &str, max: usize) {
        if max == 0 || self.count(event) <= max {
            self.warned.remove(event);
        }
    }

    /// Drop the warning marks of every event no longer over `max`.
    fn rearm_warnings(&mut self, max: usize) {
        let Self {
            persistent,
            once,
            warned,
        } = self;
        warned.retain(|event| {
            let count = persistent.len(event) + once.len(event);
            max != 0 && count > max
        });
    }
}

/// Registry of named-event listeners with cancelable, ordered dispatch.
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::new();
/// let guard = Listener::sync(|args: &[Arg]| args[0].as_u64() != Some(0));
/// dispatcher.once("write", guard.clone())?;
///
/// let outcome = dispatcher.emit_sync("write", &[0usize.into()])?;
/// assert!(outcome.is_canceled());
/// assert_eq!(dispatcher.listener_count("write"), 0);
/// ```
pub struct Dispatcher {
    registries: Mutex<Registries>,
    max_listeners: Arc<AtomicUsize>,
    listener_timeout: Option<Duration>,
    default_warning: Option<Listener>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("events", &self.event_names())
            .field("max_listeners", &self.max_listeners())
            .field("listener_timeout", &self.listener_timeout)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher with the default configuration.
    ///
    /// The default `maxListenersPassed` warning listener is installed and
    /// reports through [`TracingSink`].
    pub fn new() -> Self {
        DispatcherBuilder::new().build()
    }

    /// Create a dispatcher from a configuration.
    pub fn with_config(config: DispatcherConfig) -> Self {
        DispatcherBuilder::new().with_config(config).build()
    }

    /// Start building a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    // ------------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------------

    /// Register a persistent listener for `event`.
    ///
    /// `newListener` is emitted before the listener is added. If the event's
    /// listener count then passes the limit, `maxListenersPassed` is emitted.
    /// Either notification failing is returned as an error; a failing
    /// `newListener` leaves the listener unregistered.
    pub fn on(&self, event: &str, listener: Listener) -> EmitResult<&Self> {
        self.register(Lifetime::Persistent, event, listener)
    }

    /// Alias for [`Dispatcher::on`].
    pub fn add_listener(&self, event: &str, listener: Listener) -> EmitResult<&Self> {
        self.on(event, listener)
    }

    /// Register a one-shot listener for `event`.
    ///
    /// The listener is removed (and `removeListener` emitted) right before it
    /// is invoked, so it runs at most once per registration.
    pub fn once(&self, event: &str, listener: Listener) -> EmitResult<&Self> {
        self.register(Lifetime::Once, event, listener)
    }

    fn register(&self, lifetime: Lifetime, event: &str, listener: Listener) -> EmitResult<&Self> {
        self.announce(NEW_LISTENER, event, listener.clone().into())?;

        let passed = {
            let mut registries = self.registries.lock();
            registries.registry_mut(lifetime).append(event, listener);
            let max = self.max_listeners();
            let count = registries.count(event);
            let crossed = max != 0 && count > max;
            let first_crossing = crossed && registries.warned.insert(event.to_string());
            first_crossing.then_some(count)
        };
        tracing::trace!(event = %event, lifetime = ?lifetime, "Listener registered");

        if let Some(count) = passed {
            self.announce(MAX_LISTENERS_PASSED, event, count.into())?;
        }
        Ok(self)
    }

    /// Remove one registration of `listener` from each registry for `event`.
    ///
    /// `removeListener` is emitted once per registration actually removed,
    /// after the removal. Unknown events or listeners are ignored.
    pub fn off(&self, event: &str, listener: &Listener) -> EmitResult<&Self> {
        let removed = {
            let mut registries = self.registries.lock();
            let removed = [
                registries.persistent.remove_first(event, listener),
                registries.once.remove_first(event, listener),
            ]
            .into_iter()
            .filter(|removed| *removed)
            .count();
            registries.rearm_warning(event, self.max_listeners());
            removed
        };

        for _ in 0..removed {
            self.announce(REMOVE_LISTENER, event, listener.clone().into())?;
        }
        Ok(self)
    }

    /// Alias for [`Dispatcher::off`].
    pub fn remove_listener(&self, event: &str, listener: &Listener) -> EmitResult<&Self> {
        self.off(event, listener)
    }

    /// Remove every listener for `event`, or for all events when `None`.
    ///
    /// `removeListener` is emitted once per removed listener. When clearing
    /// everything, `removeListener`'s own listeners are removed last so they
    /// observe the other removals.
    pub fn remove_all_listeners(&self, event: Option<&str>) -> EmitResult<&Self> {
        match event {
            Some(event) => self.remove_event(event)?,
            None => {
                let (meta, rest): (Vec<String>, Vec<String>) = self
                    .event_names()
                    .into_iter()
                    .partition(|name| name == REMOVE_LISTENER);
                for name in rest.iter().chain(meta.iter()) {
                    self.remove_event(name)?;
                }
            }
        }
        Ok(self)
    }

    fn remove_event(&self, event: &str) -> EmitResult<()> {
        let removed = {
            let mut registries = self.registries.lock();
            let mut removed = registries.persistent.take(event);
            removed.extend(registries.once.take(event));
            registries.warned.remove(event);
            removed
        };
        if !removed.is_empty() {
            tracing::debug!(event = %event, count = removed.len(), "Removed all listeners");
        }

        for listener in removed {
            self.announce(REMOVE_LISTENER, event, listener.into())?;
        }
        Ok(())
    }

    /// Set the per-event listener limit. `0` disables the check.
    ///
    /// Events already warned about and still over the new limit stay quiet;
    /// the others warn again on their next crossing.
    pub fn set_max_listeners(&self, max: usize) -> &Self {
        let mut registries = self.registries.lock();
        self.max_listeners.store(max, Ordering::Relaxed);
        registries.rearm_warnings(max);
        self
    }

    /// Current per-event listener limit.
    pub fn max_listeners(&self) -> usize {
        self.max_listeners.load(Ordering::Relaxed)
    }

    /// The warning listener installed on `maxListenersPassed` at construction.
    ///
    /// Pass it to [`Dispatcher::off`] to silence the warning.
    pub fn default_warning_listener(&self) -> Option<Listener> {
        self.default_warning.clone()
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Snapshot of the listeners for `event`: persistent ones, then one-shot ones.
    pub fn listeners(&self, event: &str) -> Vec<Listener> {
        let registries = self.registries.lock();
        let mut listeners = registries.persistent.snapshot(event);
        listeners.extend(registries.once.snapshot(event));
        listeners
    }

    /// Number of listeners registered for `event` across both registries.
    pub fn listener_count(&self, event: &str) -> usize {
        self.registries.lock().count(event)
    }

    /// Number of listeners `dispatcher` has registered for `event`.
    pub fn listener_count_of(dispatcher: &Dispatcher, event: &str) -> usize {
        dispatcher.listener_count(event)
    }

    /// Sorted names of every event with at least one listener.
    pub fn event_names(&self) -> Vec<String> {
        let registries = self.registries.lock();
        registries
            .persistent
            .event_names()
            .chain(registries.once.event_names())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    // ------------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------------

    /// Dispatch `event` without suspending.
    ///
    /// Every listener must reply synchronously. A listener that suspends makes
    /// the call fail with [`EmitError::ProtocolViolation`] and nothing after
    /// it runs.
    pub fn emit_sync(&self, event: &str, args: &[Arg]) -> EmitResult<EmitOutcome> {
        let Some(call_list) = self.call_list(event) else {
            return Ok(EmitOutcome::NoListeners);
        };

        for entry in call_list {
            if entry.lifetime == Lifetime::Once {
                self.release_once(event, &entry.listener)?;
            }
            match invoke(event, &entry.listener, args)? {
                Reply::Ready(Propagation::Cancel) => return Ok(self.canceled(event)),
                Reply::Ready(Propagation::Continue) => {}
                Reply::Pending(_) => return Err(failed(EmitError::protocol_violation(event))),
            }
        }
        Ok(EmitOutcome::Completed)
    }

    /// Dispatch `event`, awaiting suspending listeners one at a time.
    ///
    /// Listeners never run concurrently: the next one is invoked only after
    /// the previous one's reply has settled. A listener resolving to
    /// [`Propagation::Cancel`] ends the emission.
    pub async fn emit(&self, event: &str, args: &[Arg]) -> EmitResult<EmitOutcome> {
        let Some(call_list) = self.call_list(event) else {
            return Ok(EmitOutcome::NoListeners);
        };

        for entry in call_list {
            if entry.lifetime == Lifetime::Once {
                self.release_once(event, &entry.listener)?;
            }
            let propagation = match invoke(event, &entry.listener, args)? {
                Reply::Ready(propagation) => propagation,
                Reply::Pending(pending) => self.settle(event, pending).await?,
            };
            if propagation.is_cancel() {
                return Ok(self.canceled(event));
            }
        }
        Ok(EmitOutcome::Completed)
    }

    fn call_list(&self, event: &str) -> Option<Vec<CallEntry>> {
        let call_list = self.registries.lock().call_list(event);
        match &call_list {
            Some(entries) => {
                tracing::trace!(event = %event, listeners = entries.len(), "Dispatching event")
            }
            None => tracing::trace!(event = %event, "No listeners"),
        }
        call_list
    }

    /// Take a one-shot listener out of the live registry before it runs.
    ///
    /// It may already be gone if an earlier listener removed it; it is still
    /// invoked because it was part of the call list.
    fn release_once(&self, event: &str, listener: &Listener) -> EmitResult<()> {
        let removed = {
            let mut registries = self.registries.lock();
            let removed = registries.once.remove_first(event, listener);
            registries.rearm_warning(event, self.max_listeners());
            removed
        };
        if removed {
            self.announce(REMOVE_LISTENER, event, listener.clone().into())?;
        }
        Ok(())
    }

    async fn settle(&self, event: &str, pending: ListenerFuture) -> EmitResult<Propagation> {
        let resolved = match self.listener_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| failed(EmitError::timeout(event, limit)))?,
            None => pending.await,
        };
        match resolved {
            Ok(propagation) => Ok(propagation),
            Err(source) => Err(failed(EmitError::listener_fault(event, source))),
        }
    }

    fn canceled(&self, event: &str) -> EmitOutcome {
        tracing::debug!(event = %event, "Event canceled by listener");
        EmitOutcome::Canceled
    }

    /// Emit a bookkeeping event. Cancellation is ignored.
    fn announce(&self, meta_event: &str, event: &str, detail: Arg) -> EmitResult<()> {
        self.emit_sync(meta_event, &[Arg::from(event), detail])?;
        Ok(())
    }
}

fn invoke(event: &str, listener: &Listener, args: &[Arg]) -> EmitResult<Reply> {
    listener
        .call(args)
        .map_err(|source| failed(EmitError::listener_fault(event, source)))
}

/// Log a dispatch failure on its way to the caller.
fn failed(err: EmitError) -> EmitError {
    tracing::warn!(
        event = %err.event(),
        category = err.category(),
        meta = is_meta_event(err.event()),
        error = %err,
        "Dispatch failed"
    );
    err
}

/// Listener that reports `maxListenersPassed` to a diagnostic sink.
fn max_listeners_warning(max: Arc<AtomicUsize>, sink: Arc<dyn DiagnosticSink>) -> Listener {
    Listener::sync(move |args: &[Arg]| {
        let event = args.first().and_then(Arg::as_str).unwrap_or_default();
        let count = args.get(1).and_then(Arg::as_u64).unwrap_or_default();
        sink.warn(&format!(
            "The event {} has exceeded {} listeners, currently at {}",
            event,
            max.load(Ordering::Relaxed),
            count
        ));
    })
}

// ============================================================================
// DispatcherBuilder
// ============================================================================

/// Builder for [`Dispatcher`].
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::builder()
///     .with_max_listeners(50)
///     .with_listener_timeout(Duration::from_secs(5))
///     .build();
/// ```
pub struct DispatcherBuilder {
    max_listeners: usize,
    warn_on_max_listeners: bool,
    listener_timeout: Option<Duration>,
    sink: Arc<dyn DiagnosticSink>,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatcherBuilder {
    /// Create a builder with default settings.
    pub fn new() -> Self {
        Self {
            max_listeners: DEFAULT_MAX_LISTENERS,
            warn_on_max_listeners: true,
            listener_timeout: None,
            sink: Arc::new(TracingSink),
        }
    }

    /// Apply every setting from `config`.
    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.listener_timeout = config.listener_timeout();
        self.max_listeners = config.max_listeners;
        self.warn_on_max_listeners = config.warn_on_max_listeners;
        self
    }

    /// Set the per-event listener limit. `0` disables the check.
    pub fn with_max_listeners(mut self, max: usize) -> Self {
        self.max_listeners = max;
        self
    }

    /// Bound how long `emit` waits for each suspending listener.
    pub fn with_listener_timeout(mut self, limit: Duration) -> Self {
        self.listener_timeout = Some(limit);
        self
    }

    /// Do not install the default `maxListenersPassed` warning listener.
    pub fn without_default_warning(mut self) -> Self {
        self.warn_on_max_listeners = false;
        self
    }

    /// Send the default warning to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Build the dispatcher.
    pub fn build(self) -> Dispatcher {
        let max_listeners = Arc::new(AtomicUsize::new(self.max_listeners));
        let mut registries = Registries::default();

        let default_warning = self.warn_on_max_listeners.then(|| {
            let listener = max_listeners_warning(Arc::clone(&max_listeners), self.sink);
            registries.persistent.append(MAX_LISTENERS_PASSED, listener.clone());
            listener
        });

        Dispatcher {
            registries: Mutex::new(registries),
            max_listeners,
            listener_timeout: self.listener_timeout,
            default_warning,
        }
    }
}
