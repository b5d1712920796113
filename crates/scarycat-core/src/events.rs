//! Structured event sink
//!
//! The screener reports what it is doing through an [`EventSink`] handed to it
//! by the caller. Nothing in the screening path reads logging state from the
//! environment, and the choice of sink never changes a screening outcome.

use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;

/// Severity of a screening event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for EventLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A single event emitted by the screener
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreeningEvent {
    pub level: EventLevel,
    pub message: String,
}

impl ScreeningEvent {
    pub fn new(level: EventLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Output-only channel for screening events
pub trait EventSink: Send + Sync {
    /// Receive one event
    fn emit(&self, event: ScreeningEvent);

    fn debug(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.emit(ScreeningEvent::new(EventLevel::Debug, message));
    }

    fn info(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.emit(ScreeningEvent::new(EventLevel::Info, message));
    }

    fn warning(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.emit(ScreeningEvent::new(EventLevel::Warning, message));
    }

    fn error(&self, message: impl Into<String>)
    where
        Self: Sized,
    {
        self.emit(ScreeningEvent::new(EventLevel::Error, message));
    }
}

/// Forwards events to `tracing` under the `scarycat` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: ScreeningEvent) {
        match event.level {
            EventLevel::Debug => tracing::debug!(target: "scarycat", "{}", event.message),
            EventLevel::Info => tracing::info!(target: "scarycat", "{}", event.message),
            EventLevel::Warning => tracing::warn!(target: "scarycat", "{}", event.message),
            EventLevel::Error => tracing::error!(target: "scarycat", "{}", event.message),
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ScreeningEvent) {}
}

/// Keeps every event in memory, in emission order
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<ScreeningEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    pub fn events(&self) -> Vec<ScreeningEvent> {
        self.events.lock().clone()
    }

    /// Recorded events at exactly `level`
    pub fn at_level(&self, level: EventLevel) -> Vec<ScreeningEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }

    /// True if any recorded message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.events.lock().iter().any(|e| e.message.contains(needle))
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: ScreeningEvent) {
        self.events.lock().push(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn emit(&self, event: ScreeningEvent) {
        (**self).emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.info("loaded 3 models");
        sink.warning("model ears_back returned an unrecognized result");

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].level, EventLevel::Info);
        assert_eq!(sink.at_level(EventLevel::Warning).len(), 1);
        assert!(sink.contains("ears_back"));

        sink.clear();
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_arc_dyn_sink_forwards() {
        let memory = Arc::new(MemorySink::new());
        let sink: Arc<dyn EventSink> = memory.clone();

        sink.emit(ScreeningEvent::new(EventLevel::Error, "boom"));
        sink.debug("via helper");

        assert_eq!(memory.events().len(), 2);
    }

    #[test]
    fn test_tracing_sink_with_subscriber() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        tracing::subscriber::with_default(subscriber, || {
            TracingSink.info("hello");
            NullSink.error("dropped");
        });
    }

    #[test]
    fn test_level_display() {
        assert_eq!(EventLevel::Warning.to_string(), "warning");
        assert!(EventLevel::Error > EventLevel::Debug);
    }
}
