//! Progress and diagnostic reporting.
//!
//! Components never log to a global callback; they receive a [`ProgressSink`]
//! and report through it. [`TracingSink`] is the default and forwards every
//! message to `tracing`.

use std::sync::Mutex;
use tracing::{
    error,
    info,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Only written to the log.
    Log,
    /// Logged and shown to the user.
    Surface,
    /// Logged and shown to the user as a failure.
    Error,
}

pub trait ProgressSink: Sync {
    fn report(&self, message: &str, severity: Severity);

    fn log(&self, message: &str) {
        self.report(message, Severity::Log);
    }

    fn surface(&self, message: &str) {
        self.report(message, Severity::Surface);
    }

    fn error(&self, message: &str) {
        self.report(message, Severity::Error);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn report(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Log => info!(target: "catalyst", "{}", message),
            Severity::Surface => info!(target: "catalyst", surfaced = true, "{}", message),
            Severity::Error => error!(target: "catalyst", "{}", message),
        }
    }
}

/// Keeps every reported message, mostly useful in tests.
#[derive(Debug, Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(Severity, String)> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.messages()
            .iter()
            .filter(|(s, _)| *s == severity)
            .count()
    }
}

impl ProgressSink for CollectingSink {
    fn report(&self, message: &str, severity: Severity) {
        TracingSink.report(message, severity);
        match self.messages.lock() {
            Ok(mut guard) => guard.push((severity, message.to_string())),
            Err(poisoned) => poisoned.into_inner().push((severity, message.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_sink_keeps_order() {
        let sink = CollectingSink::new();
        sink.log("parsing");
        sink.surface("done");
        sink.error("oops");
        let msgs = sink.messages();
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[0], (Severity::Log, "parsing".to_string()));
        assert_eq!(msgs[2].0, Severity::Error);
        assert_eq!(sink.count(Severity::Surface), 1);
    }
}
