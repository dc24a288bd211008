//! ==============================================================================
//! cache.rs - latest telemetry per topic
//! ==============================================================================
//!
//! written by the mqtt ingress task, read by the render loop. a put swaps the
//! whole record behind an Arc, so a reader either sees the old record or the
//! new one, never a mix.
//!
//! ==============================================================================

use crate::domain::Record;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct TelemetryCache {
    records: Arc<RwLock<HashMap<String, Arc<Record>>>>,
}

impl TelemetryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// replace whatever was stored for `topic`; fields are never merged
    pub async fn put(&self, topic: impl Into<String>, record: Record) {
        self.records.write().await.insert(topic.into(), Arc::new(record));
    }

    #[cfg(test)]
    pub async fn get(&self, topic: &str) -> Option<Arc<Record>> {
        self.records.read().await.get(topic).cloned()
    }

    pub async fn has(&self, topic: &str) -> bool {
        self.records.read().await.contains_key(topic)
    }

    /// point-in-time copy for one render pass
    pub async fn snapshot(&self) -> Snapshot {
        Snapshot {
            records: self.records.read().await.clone(),
        }
    }
}

/// read-only view of the cache, detached from the lock
#[derive(Clone, Default, Debug)]
pub struct Snapshot {
    records: HashMap<String, Arc<Record>>,
}

impl Snapshot {
    pub fn get(&self, topic: &str) -> Option<&Record> {
        self.records.get(topic).map(|r| r.as_ref())
    }
}

impl<S: Into<String>> FromIterator<(S, Record)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (S, Record)>>(iter: I) -> Self {
        Self {
            records: iter
                .into_iter()
                .map(|(topic, record)| (topic.into(), Arc::new(record)))
                .collect(),
        }
    }
}
