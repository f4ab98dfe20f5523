use crate::output::traits::{DocumentSink, SinkError, SinkResult};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// In-memory sink for tests and for embedders that post-process documents
#[derive(Debug, Default)]
pub struct MemorySink {
    documents: Mutex<HashMap<String, String>>,
    rejected: HashSet<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write for `identifier` fail
    pub fn reject(mut self, identifier: impl Into<String>) -> Self {
        self.rejected.insert(identifier.into());
        self
    }

    /// Pre-populates a document, as if written by an earlier run
    pub fn with_document(self, identifier: impl Into<String>, text: impl Into<String>) -> Self {
        self.lock().insert(identifier.into(), text.into());
        self
    }

    pub fn get(&self, identifier: &str) -> Option<String> {
        self.lock().get(identifier).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        // A poisoned map still holds every completed write
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentSink for MemorySink {
    async fn write(&self, identifier: &str, text: &str) -> SinkResult<()> {
        if self.rejected.contains(identifier) {
            return Err(SinkError::Rejected(identifier.to_string()));
        }
        self.lock().insert(identifier.to_string(), text.to_string());
        Ok(())
    }

    async fn contains(&self, identifier: &str) -> bool {
        self.lock().contains_key(identifier)
    }
}
