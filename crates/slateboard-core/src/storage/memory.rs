//! In-memory snapshot backend, mainly for tests and previews.

use super::{Storage, StorageError, StorageResult};
use std::collections::HashMap;

/// Snapshot storage backed by a plain map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn save(&mut self, id: &str, blob: &[u8]) -> StorageResult<()> {
        self.blobs.insert(id.to_string(), blob.to_vec());
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<Vec<u8>> {
        self.blobs
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn delete(&mut self, id: &str) -> StorageResult<()> {
        self.blobs
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let mut ids: Vec<String> = self.blobs.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn exists(&self, id: &str) -> bool {
        self.blobs.contains_key(id)
    }
}
