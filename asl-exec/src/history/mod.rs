mod sink;

pub use sink::{
    CompositeHistorySink, HistorySink, MemoryHistorySink, NoOpHistorySink, StdoutHistorySink,
};

use asl_core::HistoryEventType;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub event_type: HistoryEventType,
    pub details: JsonValue,
}

/// A history event with its position in the execution's history, from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: u64,
    #[serde(flatten)]
    pub event: HistoryEvent,
}

/// Append-only log owned by one evaluation frame.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<HistoryEvent>,
}

impl EventLog {
    pub fn append(&mut self, event_type: HistoryEventType, details: JsonValue) {
        self.events.push(HistoryEvent {
            timestamp: Utc::now(),
            event_type,
            details,
        });
    }

    pub fn extend(&mut self, other: EventLog) {
        self.events.extend(other.events);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEvent> {
        self.events.iter()
    }

    pub fn event_types(&self) -> Vec<HistoryEventType> {
        self.events.iter().map(|e| e.event_type).collect()
    }

    pub fn into_entries(self) -> Vec<HistoryEntry> {
        self.events
            .into_iter()
            .zip(1u64..)
            .map(|(event, id)| HistoryEntry { id, event })
            .collect()
    }
}
