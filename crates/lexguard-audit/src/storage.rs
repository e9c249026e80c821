//! Durable storage seam for audit entries.
//!
//! The log owns ordering and hashing; storage only persists what it is
//! given and hands it back in id order. Implementations must never
//! reorder, rewrite or drop accepted entries.

use std::fmt::Debug;
use std::sync::RwLock;
use std::time::Duration;

use lexguard_types::LogId;
use thiserror::Error;

use crate::entry::AuditLogEntry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Audit storage unavailable: {0}")]
    Unavailable(String),

    #[error("Audit storage timed out after {0:?}")]
    Timeout(Duration),
}

/// Append-only entry store.
pub trait AuditStorage: Send + Sync + Debug {
    /// Persists `entry`. On error nothing is stored.
    fn append(&self, entry: &AuditLogEntry) -> Result<(), StorageError>;

    /// Returns up to `limit` entries with id strictly greater than `after`,
    /// in ascending id order.
    fn scan(&self, after: LogId, limit: usize) -> Result<Vec<AuditLogEntry>, StorageError>;

    /// Returns the most recently appended entry.
    fn last(&self) -> Result<Option<AuditLogEntry>, StorageError>;

    /// Returns the total number of stored entries.
    fn len(&self) -> Result<usize, StorageError>;
}

/// Failure mode injected into [`InMemoryAuditStorage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageFault {
    Unavailable,
    Timeout(Duration),
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: Vec<AuditLogEntry>,
    fault: Option<StorageFault>,
}

/// Process-local storage used by tests and single-node deployments.
///
/// Supports fault injection so callers can exercise the "audit write
/// failed, so the action did not happen" path.
#[derive(Debug, Default)]
pub struct InMemoryAuditStorage {
    inner: RwLock<MemoryInner>,
}

impl InMemoryAuditStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `fault` until cleared.
    pub fn inject_fault(&self, fault: StorageFault) {
        self.write().fault = Some(fault);
    }

    pub fn clear_fault(&self) {
        self.write().fault = None;
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MemoryInner> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MemoryInner> {
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn check(fault: Option<StorageFault>) -> Result<(), StorageError> {
        match fault {
            None => Ok(()),
            Some(StorageFault::Unavailable) => Err(StorageError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            )),
            Some(StorageFault::Timeout(after)) => Err(StorageError::Timeout(after)),
        }
    }

    #[cfg(test)]
    pub(crate) fn tamper(&self, index: usize, details: &str) {
        self.write().entries[index].details = details.to_string();
    }
}

impl AuditStorage for InMemoryAuditStorage {
    fn append(&self, entry: &AuditLogEntry) -> Result<(), StorageError> {
        let mut inner = self.write();
        Self::check(inner.fault)?;
        inner.entries.push(entry.clone());
        Ok(())
    }

    fn scan(&self, after: LogId, limit: usize) -> Result<Vec<AuditLogEntry>, StorageError> {
        let inner = self.read();
        Self::check(inner.fault)?;
        // Ids are dense and start at 1, so the entry with id `after + 1`
        // sits at index `after`.
        let start = usize::try_from(after.as_u64()).unwrap_or(usize::MAX);
        Ok(inner
            .entries
            .iter()
            .skip(start)
            .take(limit)
            .cloned()
            .collect())
    }

    fn last(&self) -> Result<Option<AuditLogEntry>, StorageError> {
        let inner = self.read();
        Self::check(inner.fault)?;
        Ok(inner.entries.last().cloned())
    }

    fn len(&self) -> Result<usize, StorageError> {
        let inner = self.read();
        Self::check(inner.fault)?;
        Ok(inner.entries.len())
    }
}
