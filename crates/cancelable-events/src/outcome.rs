//! Result of a single emission.

/// How an emission ended.
///
/// | Variant | Listeners ran? | Canceled? |
/// |---------|----------------|-----------|
/// | `NoListeners` | No | No |
/// | `Canceled` | Up to the canceling one | Yes |
/// | `Completed` | All | No |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmitOutcome {
    /// No listener was registered for the event.
    NoListeners,
    /// A listener canceled the emission; later listeners were skipped.
    Canceled,
    /// Every listener ran and none canceled.
    Completed,
}

impl EmitOutcome {
    /// Check if a listener canceled the emission.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Check if every listener ran without canceling.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Check if at least one listener was registered when the emission started.
    pub fn had_listeners(&self) -> bool {
        !matches!(self, Self::NoListeners)
    }

    /// Collapses the outcome to "was the event allowed through".
    ///
    /// `NoListeners` and `Completed` both count as propagated.
    pub fn propagated(&self) -> bool {
        !self.is_canceled()
    }
}

impl std::fmt::Display for EmitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoListeners => write!(f, "NoListeners"),
            Self::Canceled => write!(f, "Canceled"),
            Self::Completed => write!(f, "Completed"),
        }
    }
}
