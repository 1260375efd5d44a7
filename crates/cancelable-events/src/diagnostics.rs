//! Where the dispatcher's human-readable warnings go.

/// Receiver for diagnostic messages such as the max-listeners warning.
pub trait DiagnosticSink: Send + Sync {
    /// Record a warning.
    fn warn(&self, message: &str);
}

/// Sink that forwards warnings to `tracing` at `WARN` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "cancelable_events", "{}", message);
    }
}
