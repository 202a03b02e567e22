//! Event recording.
//!
//! Recording is fire-and-forget: the reconciler never waits on a recorder
//! and a lost notification is acceptable. Events for a phase are recorded
//! before the corresponding status write, so observers may see an event
//! for a transition whose persist is still being retried (at-least-once).

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use atjob_api::ResourceKey;

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    /// Informational.
    Normal,
    /// Something needs attention.
    Warning,
}

impl fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventSeverity::Normal => f.write_str("Normal"),
            EventSeverity::Warning => f.write_str("Warning"),
        }
    }
}

/// A recorded event.
#[derive(Debug, Clone)]
pub struct EventRecord {
    /// Key of the resource the event is about.
    pub subject: ResourceKey,
    /// Severity.
    pub severity: EventSeverity,
    /// Short machine-readable reason, e.g. "PhaseChange".
    pub reason: String,
    /// Human-readable message.
    pub message: String,
    /// Recording time.
    pub timestamp: DateTime<Utc>,
}

/// Non-blocking notification sink.
pub trait EventRecorder: Send + Sync {
    /// Record an event. No acknowledgment, no result.
    fn record(&self, subject: &ResourceKey, severity: EventSeverity, reason: &str, message: &str);
}

/// Recorder that emits structured tracing events.
#[derive(Debug, Default)]
pub struct LogRecorder;

impl LogRecorder {
    /// Create a new log recorder.
    pub fn new() -> Self {
        Self
    }
}

impl EventRecorder for LogRecorder {
    fn record(&self, subject: &ResourceKey, severity: EventSeverity, reason: &str, message: &str) {
        match severity {
            EventSeverity::Normal => {
                info!(subject = %subject, reason, message, "event");
            }
            EventSeverity::Warning => {
                warn!(subject = %subject, reason, message, "event");
            }
        }
    }
}

/// Recorder that accumulates events in memory for assertions.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<EventRecord>>,
}

impl MemoryRecorder {
    /// Create a new memory recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events.
    pub fn records(&self) -> Vec<EventRecord> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events recorded for a specific subject.
    pub fn records_for(&self, subject: &ResourceKey) -> Vec<EventRecord> {
        self.records()
            .into_iter()
            .filter(|e| &e.subject == subject)
            .collect()
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, subject: &ResourceKey, severity: EventSeverity, reason: &str, message: &str) {
        let record = EventRecord {
            subject: subject.clone(),
            severity,
            reason: reason.to_string(),
            message: message.to_string(),
            timestamp: Utc::now(),
        };
        // Fire-and-forget: a poisoned lock just drops the record.
        if let Ok(mut events) = self.events.lock() {
            events.push(record);
        }
    }
}
