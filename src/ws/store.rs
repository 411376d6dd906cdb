//! Contract between the session hub and document persistence.

use async_trait::async_trait;

/// Errors surfaced by a content store
#[derive(Debug)]
pub enum StoreError {
    /// The identifier cannot address a stored document
    InvalidId(String),
    /// The backing database rejected the operation
    Database(String),
    /// No store has been initialized
    Unavailable,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::InvalidId(id) => write!(f, "Invalid document id '{}'", id),
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::Unavailable => write!(f, "Document store not initialized"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Whole-document content access by id.
///
/// The hub treats content as a single mutable cell: a read returns the last
/// successfully committed write, a write overwrites wholesale. No merge, no
/// version check.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn read(&self, document_id: &str) -> Result<Option<String>, StoreError>;
    async fn write(&self, document_id: &str, content: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// In-memory store for hub tests. Write delays can be keyed by content
    /// value to exercise the last-completed-write-wins race.
    #[derive(Default)]
    pub struct MemoryStore {
        cells: Mutex<HashMap<String, String>>,
        write_delays: Mutex<HashMap<String, Duration>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_content(document_id: &str, content: &str) -> Self {
            let store = Self::default();
            store
                .cells
                .lock()
                .unwrap()
                .insert(document_id.to_string(), content.to_string());
            store
        }

        pub fn delay_write_of(&self, content: &str, delay: Duration) {
            self.write_delays
                .lock()
                .unwrap()
                .insert(content.to_string(), delay);
        }

        pub fn stored(&self, document_id: &str) -> Option<String> {
            self.cells.lock().unwrap().get(document_id).cloned()
        }
    }

    #[async_trait]
    impl ContentStore for MemoryStore {
        async fn read(&self, document_id: &str) -> Result<Option<String>, StoreError> {
            Ok(self.cells.lock().unwrap().get(document_id).cloned())
        }

        async fn write(&self, document_id: &str, content: &str) -> Result<(), StoreError> {
            let delay = self.write_delays.lock().unwrap().get(content).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.cells
                .lock()
                .unwrap()
                .insert(document_id.to_string(), content.to_string());
            Ok(())
        }
    }

    /// Store whose every operation fails, for degraded-mode tests.
    pub struct FailingStore;

    #[async_trait]
    impl ContentStore for FailingStore {
        async fn read(&self, _document_id: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Unavailable)
        }

        async fn write(&self, _document_id: &str, _content: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable)
        }
    }
}
