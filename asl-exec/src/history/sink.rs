use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::HistoryEntry;

/// Receives an execution's history once the execution completes.
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn emit(&self, execution_id: Uuid, entry: HistoryEntry);
}

pub struct CompositeHistorySink {
    sinks: Vec<Box<dyn HistorySink>>,
}

impl Default for CompositeHistorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeHistorySink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Box<dyn HistorySink>) {
        self.sinks.push(sink);
    }
}

#[async_trait]
impl HistorySink for CompositeHistorySink {
    async fn emit(&self, execution_id: Uuid, entry: HistoryEntry) {
        for sink in &self.sinks {
            sink.emit(execution_id, entry.clone()).await;
        }
    }
}

/// Writes one JSON line per entry.
pub struct StdoutHistorySink;

#[async_trait]
impl HistorySink for StdoutHistorySink {
    async fn emit(&self, execution_id: Uuid, entry: HistoryEntry) {
        let mut json = serde_json::to_value(&entry).unwrap_or_default();
        if let Some(obj) = json.as_object_mut() {
            obj.insert(
                "execution_id".to_string(),
                serde_json::Value::String(execution_id.to_string()),
            );
        }
        println!("{}", serde_json::to_string(&json).unwrap_or_default());
    }
}

/// Keeps every entry in memory, in emission order.
#[derive(Default)]
pub struct MemoryHistorySink {
    entries: Mutex<Vec<(Uuid, HistoryEntry)>>,
}

impl MemoryHistorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<(Uuid, HistoryEntry)> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl HistorySink for MemoryHistorySink {
    async fn emit(&self, execution_id: Uuid, entry: HistoryEntry) {
        self.entries.lock().await.push((execution_id, entry));
    }
}

pub struct NoOpHistorySink;

#[async_trait]
impl HistorySink for NoOpHistorySink {
    async fn emit(&self, _execution_id: Uuid, _entry: HistoryEntry) {}
}
