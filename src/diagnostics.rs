//! Internal diagnostic logging.
//!
//! The forwarder never reports network trouble to callers through errors, so
//! its diagnostic lines are the only detailed signal. By default they go to
//! the `log` facade; callers can supply their own sink through the builder,
//! and tests capture lines with [`MemoryDiagnostics`].

use std::sync::Arc;

use parking_lot::Mutex;

/// Severity-free sink for the forwarder's own operational messages.
pub trait DiagnosticLogger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Default diagnostics: forward to the `log` crate under the
/// `fluent_forward` target.
#[derive(Debug, Default)]
pub struct StdLogDiagnostics;

impl DiagnosticLogger for StdLogDiagnostics {
    fn error(&self, message: &str) {
        log::error!(target: "fluent_forward", "{message}");
    }

    fn warn(&self, message: &str) {
        log::warn!(target: "fluent_forward", "{message}");
    }

    fn debug(&self, message: &str) {
        log::debug!(target: "fluent_forward", "{message}");
    }
}

/// Diagnostics sink that stores every line for later inspection.
#[derive(Clone, Default)]
pub struct MemoryDiagnostics {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every line logged so far, oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// True when any logged line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }

    /// Number of logged lines containing `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines
            .lock()
            .iter()
            .filter(|line| line.contains(needle))
            .count()
    }
}

impl DiagnosticLogger for MemoryDiagnostics {
    fn error(&self, message: &str) {
        self.lines.lock().push(format!("ERROR {message}"));
    }

    fn warn(&self, message: &str) {
        self.lines.lock().push(format!("WARN {message}"));
    }

    fn debug(&self, message: &str) {
        self.lines.lock().push(format!("DEBUG {message}"));
    }
}
