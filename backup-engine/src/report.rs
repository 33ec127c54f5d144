//! Reporting sink for human-readable progress notices.
//!
//! The engine only emits `(severity, message)` pairs; formatting and output
//! are up to the sink handed to it at construction.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Success,
}

pub trait Reporter: Send + Sync {
    fn report(&self, severity: Severity, message: &str);

    fn debug(&self, message: &str) {
        self.report(Severity::Debug, message);
    }

    fn info(&self, message: &str) {
        self.report(Severity::Info, message);
    }

    fn warn(&self, message: &str) {
        self.report(Severity::Warn, message);
    }

    fn success(&self, message: &str) {
        self.report(Severity::Success, message);
    }
}

/// Forwards notices to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!("{}", message),
            Severity::Info => tracing::info!("{}", message),
            Severity::Warn => tracing::warn!("{}", message),
            Severity::Success => tracing::info!(outcome = "success", "{}", message),
        }
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&self, _severity: Severity, _message: &str) {}
}

/// Keeps every notice in memory, in emission order
#[derive(Debug, Default, Clone)]
pub struct MemoryReporter {
    entries: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(Severity, String)> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages emitted with the given severity
    pub fn messages(&self, severity: Severity) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, severity: Severity, message: &str) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push((severity, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_reporter_records_in_order() {
        let reporter = MemoryReporter::new();
        reporter.info("first");
        reporter.warn("second");
        reporter.success("third");

        assert_eq!(
            reporter.entries(),
            vec![
                (Severity::Info, "first".to_string()),
                (Severity::Warn, "second".to_string()),
                (Severity::Success, "third".to_string()),
            ]
        );
        assert_eq!(reporter.messages(Severity::Warn), vec!["second".to_string()]);
    }

    #[test]
    fn test_memory_reporter_clones_share_entries() {
        let reporter = MemoryReporter::new();
        let shared: Arc<dyn Reporter> = Arc::new(reporter.clone());
        shared.debug("through the trait object");
        assert_eq!(reporter.entries().len(), 1);
    }
}
