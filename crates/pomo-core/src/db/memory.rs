//! In-process key-value medium

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{check_capacity, KeyValueStorage, StorageUsage};
use crate::error::{Error, Result};

/// Map-backed medium with an optional byte budget.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
    capacity_bytes: Option<usize>,
}

impl MemoryStorage {
    /// Unbounded medium
    pub fn new() -> Self {
        Self::default()
    }

    /// Medium that rejects writes once keys plus values exceed `capacity_bytes`
    pub fn with_capacity(capacity_bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            capacity_bytes: Some(capacity_bytes),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::Storage("memory storage lock poisoned".into()))
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.lock()?;
        let existing_bytes = entries
            .get(key)
            .map_or(0, |existing| key.len() + existing.len());
        let usage = StorageUsage {
            used_bytes: used_bytes(&entries),
            capacity_bytes: self.capacity_bytes,
        };
        check_capacity(usage, existing_bytes, key.len() + value.len())?;

        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn usage(&self) -> Result<StorageUsage> {
        Ok(StorageUsage {
            used_bytes: used_bytes(&*self.lock()?),
            capacity_bytes: self.capacity_bytes,
        })
    }
}

fn used_bytes(entries: &HashMap<String, String>) -> usize {
    entries
        .iter()
        .map(|(key, value)| key.len() + value.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_roundtrip() {
        let storage = MemoryStorage::new();
        storage.set("k", "v").unwrap();
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("v"));

        storage.remove("k").unwrap();
        assert_eq!(storage.get("k").unwrap(), None);
        storage.remove("k").unwrap();
    }

    #[test]
    fn oversized_write_is_rejected_and_keeps_previous_value() {
        let storage = MemoryStorage::with_capacity(8);
        storage.set("k", "1234").unwrap();

        let error = storage.set("k", "123456789").unwrap_err();
        assert!(error.is_capacity());
        assert_eq!(storage.get("k").unwrap().as_deref(), Some("1234"));
        assert_eq!(storage.usage().unwrap().used_bytes, 5);
    }
}
