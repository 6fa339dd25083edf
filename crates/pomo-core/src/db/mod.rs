//! Key-value persistence media for Pomo

mod connection;
mod memory;
mod migrations;

pub use connection::Database;
pub use memory::MemoryStorage;

use serde::Serialize;

use crate::error::Result;

/// Default byte budget for a storage medium, mirroring a browser-style
/// key-value quota.
pub const DEFAULT_CAPACITY_BYTES: usize = 5 * 1024 * 1024;

/// Synchronous key-value medium with a finite capacity.
///
/// Implementations must reject an oversized `set` with
/// [`Error::CapacityExceeded`](crate::Error::CapacityExceeded) and leave the
/// previous value untouched.
pub trait KeyValueStorage {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; deleting a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// Current space accounting
    fn usage(&self) -> Result<StorageUsage>;
}

/// Bytes used by all keys and values, and the configured budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub used_bytes: usize,
    pub capacity_bytes: Option<usize>,
}

impl StorageUsage {
    /// Remaining bytes, or `None` when the medium is unbounded
    pub fn available_bytes(&self) -> Option<usize> {
        self.capacity_bytes
            .map(|capacity| capacity.saturating_sub(self.used_bytes))
    }
}

/// Check that replacing `existing_bytes` with `entry_bytes` fits the budget.
pub(crate) fn check_capacity(
    usage: StorageUsage,
    existing_bytes: usize,
    entry_bytes: usize,
) -> Result<()> {
    let Some(capacity) = usage.capacity_bytes else {
        return Ok(());
    };

    let available = capacity.saturating_sub(usage.used_bytes.saturating_sub(existing_bytes));
    if entry_bytes > available {
        return Err(crate::Error::CapacityExceeded {
            requested: entry_bytes,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_capacity_counts_replaced_entry_as_free() {
        let usage = StorageUsage {
            used_bytes: 90,
            capacity_bytes: Some(100),
        };
        assert!(check_capacity(usage, 0, 10).is_ok());
        assert!(check_capacity(usage, 0, 11).is_err());
        assert!(check_capacity(usage, 50, 60).is_ok());
    }

    #[test]
    fn unbounded_medium_accepts_anything() {
        let usage = StorageUsage {
            used_bytes: usize::MAX,
            capacity_bytes: None,
        };
        assert!(check_capacity(usage, 0, usize::MAX).is_ok());
        assert_eq!(usage.available_bytes(), None);
    }
}
