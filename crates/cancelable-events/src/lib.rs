//! Cancelable, ordered event dispatch.
//!
//! A [`Dispatcher`] keeps two registries of listeners keyed by event name:
//! persistent listeners (added with [`Dispatcher::on`]) and one-shot
//! listeners (added with [`Dispatcher::once`]). Every emission runs the
//! one-shot listeners first and then the persistent ones, each group in
//! insertion order. Any listener can stop the emission by returning
//! [`Propagation::Cancel`] (or `false`).
//!
//! # Dispatch paths
//!
//! - [`Dispatcher::emit`] awaits suspending listeners one at a time.
//! - [`Dispatcher::emit_sync`] never suspends; a suspending listener on this
//!   path is an [`EmitError::ProtocolViolation`].
//!
//! Both return an [`EmitOutcome`]: `NoListeners`, `Canceled` or `Completed`.
//!
//! # Meta-events
//!
//! Registration bookkeeping is itself announced through the synchronous path:
//!
//! | Event | Arguments | When |
//! |-------|-----------|------|
//! | `newListener` | `(event_name, listener)` | before a listener is added |
//! | `removeListener` | `(event_name, listener)` | after a listener is removed |
//! | `maxListenersPassed` | `(event_name, count)` | when an event crosses the threshold |
//!
//! # Example
//!
//! ```rust,ignore
//! use cancelable_events::{Arg, Dispatcher, Listener};
//!
//! let dispatcher = Dispatcher::new();
//! dispatcher
//!     .on("save", Listener::sync(|args: &[Arg]| args[0].as_str() != Some("readonly")))?
//!     .on("save", Listener::suspending(|_args| async {
//!         tokio::task::yield_now().await;
//!     }))?;
//!
//! let outcome = dispatcher.emit("save", &["draft".into()]).await?;
//! assert!(outcome.is_completed());
//! ```

pub mod config;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod listener;
pub mod meta;
pub mod outcome;

mod registry;

pub use config::{ConfigError, DispatcherConfig, DEFAULT_MAX_LISTENERS};
pub use diagnostics::{DiagnosticSink, TracingSink};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::{EmitError, EmitResult};
pub use listener::{Arg, Listener, ListenerFuture, Propagation, Reply};
pub use meta::{is_meta_event, MAX_LISTENERS_PASSED, NEW_LISTENER, REMOVE_LISTENER};
pub use outcome::EmitOutcome;
