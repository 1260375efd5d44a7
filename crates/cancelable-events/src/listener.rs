//! Listener handles, their arguments and their replies.
//!
//! A [`Listener`] is a shared callable. Calling it yields a [`Reply`]:
//!
//! - [`Reply::Ready`] for synchronous listeners, carrying the [`Propagation`]
//!   decision directly.
//! - [`Reply::Pending`] for suspending listeners, carrying a future that
//!   resolves to the decision.
//!
//! The dispatcher inspects the reply at the call site, so no flag has to be
//! attached to the listener when it is registered.

use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Whether an emission continues past a listener.
///
/// `Cancel` is the cancellation sentinel: the emission stops and later
/// listeners are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Propagation {
    /// Pass the event on to the next listener.
    #[default]
    Continue,
    /// Stop the emission.
    Cancel,
}

impl Propagation {
    /// Check if this is the cancellation sentinel.
    pub fn is_cancel(&self) -> bool {
        matches!(self, Self::Cancel)
    }
}

impl From<()> for Propagation {
    fn from(_: ()) -> Self {
        Self::Continue
    }
}

/// `false` cancels, `true` continues.
impl From<bool> for Propagation {
    fn from(proceed: bool) -> Self {
        if proceed {
            Self::Continue
        } else {
            Self::Cancel
        }
    }
}

/// Only `Some(false)` cancels.
impl From<Option<bool>> for Propagation {
    fn from(proceed: Option<bool>) -> Self {
        proceed.map_or(Self::Continue, Self::from)
    }
}

/// Future returned by a suspending listener.
pub type ListenerFuture = BoxFuture<'static, anyhow::Result<Propagation>>;

/// What a listener hands back when it is invoked.
pub enum Reply {
    /// The listener finished synchronously.
    Ready(Propagation),
    /// The listener suspended; the decision is available once this resolves.
    Pending(ListenerFuture),
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready(propagation) => f.debug_tuple("Ready").field(propagation).finish(),
            Self::Pending(_) => f.write_str("Pending(..)"),
        }
    }
}

type ListenerFn = dyn Fn(&[Arg]) -> anyhow::Result<Reply> + Send + Sync;

/// Shared handle to a registered callable.
///
/// Cloning is cheap and keeps identity: two handles are equal only if they
/// were cloned from the same [`Listener`]. Removal uses this identity, so keep
/// a clone of whatever you register if you want to unregister it later.
#[derive(Clone)]
pub struct Listener {
    inner: Arc<ListenerFn>,
}

impl Listener {
    /// Wrap a raw callable that builds its own [`Reply`].
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&[Arg]) -> anyhow::Result<Reply> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(callback),
        }
    }

    /// Create a synchronous listener.
    ///
    /// The return value converts into [`Propagation`], so closures may return
    /// `()`, `bool` or a `Propagation`.
    pub fn sync<F, R>(callback: F) -> Self
    where
        F: Fn(&[Arg]) -> R + Send + Sync + 'static,
        R: Into<Propagation>,
    {
        Self::new(move |args| Ok(Reply::Ready(callback(args).into())))
    }

    /// Create a synchronous listener whose body can fail.
    pub fn try_sync<F, R>(callback: F) -> Self
    where
        F: Fn(&[Arg]) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Propagation>,
    {
        Self::new(move |args| callback(args).map(|r| Reply::Ready(r.into())))
    }

    /// Create a suspending listener.
    ///
    /// The arguments are cloned into the callback so the returned future can
    /// outlive the emission's borrow.
    pub fn suspending<F, Fut, R>(callback: F) -> Self
    where
        F: Fn(Vec<Arg>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: Into<Propagation>,
    {
        Self::new(move |args| {
            let fut = callback(args.to_vec());
            let pending: ListenerFuture = Box::pin(async move { Ok(fut.await.into()) });
            Ok(Reply::Pending(pending))
        })
    }

    /// Create a suspending listener whose body can fail.
    pub fn try_suspending<F, Fut, R>(callback: F) -> Self
    where
        F: Fn(Vec<Arg>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<Propagation>,
    {
        Self::new(move |args| {
            let fut = callback(args.to_vec());
            let pending: ListenerFuture = Box::pin(async move { fut.await.map(Into::into) });
            Ok(Reply::Pending(pending))
        })
    }

    /// Invoke the listener.
    pub fn call(&self, args: &[Arg]) -> anyhow::Result<Reply> {
        (self.inner)(args)
    }

    /// Check if both handles point at the same registration target.
    pub fn ptr_eq(&self, other: &Listener) -> bool {
        // Compare data pointers only; vtable pointers are not guaranteed unique.
        Arc::as_ptr(&self.inner) as *const () == Arc::as_ptr(&other.inner) as *const ()
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.inner) as *const ())
    }
}

/// One positional argument of an emission.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// Plain data.
    Value(Value),
    /// A listener handle, as carried by `newListener` and `removeListener`.
    Listener(Listener),
}

impl Arg {
    /// Borrow the argument as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(value) => value.as_str(),
            Self::Listener(_) => None,
        }
    }

    /// Read the argument as an unsigned integer, if it is one.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Value(value) => value.as_u64(),
            Self::Listener(_) => None,
        }
    }

    /// Borrow the argument as a listener handle, if it is one.
    pub fn as_listener(&self) -> Option<&Listener> {
        match self {
            Self::Listener(listener) => Some(listener),
            Self::Value(_) => None,
        }
    }

    /// Borrow the argument as plain data, if it is data.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Listener(_) => None,
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<u64> for Arg {
    fn from(value: u64) -> Self {
        Self::Value(Value::from(value))
    }
}

impl From<usize> for Arg {
    fn from(value: usize) -> Self {
        Self::Value(Value::from(value as u64))
    }
}

impl From<Listener> for Arg {
    fn from(listener: Listener) -> Self {
        Self::Listener(listener)
    }
}
