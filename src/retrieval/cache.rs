use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::vector::VectorIndex;

type LockTable = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Process-memory tier of the index lookup, plus the per-document build locks
/// that keep at most one build in flight for each key.
///
/// Indexes are published whole behind an `Arc`, so a reader never sees a
/// half-built one.
#[derive(Default)]
pub struct IndexCache {
    indexes: RwLock<HashMap<String, Arc<VectorIndex>>>,
    // only held for map bookkeeping, never across an await
    build_locks: LockTable,
}

impl IndexCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Arc<VectorIndex>> {
        self.indexes.read().await.get(key).cloned()
    }

    pub async fn insert(&self, key: &str, index: Arc<VectorIndex>) {
        self.indexes.write().await.insert(key.to_string(), index);
    }

    /// Drop the cached index for `key`. Returns whether one was cached.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.indexes.write().await.remove(key).is_some()
    }

    pub async fn len(&self) -> usize {
        self.indexes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.indexes.read().await.is_empty()
    }

    /// Acquire the build lock for `key`, waiting while another holder has it.
    ///
    /// The guard owns everything it needs, so it can be handed to a blocking
    /// job and outlive the caller. A waiter that is cancelled, like a guard
    /// that is dropped, removes the key's table entry once nothing else
    /// refers to it.
    pub async fn build_lock(&self, key: &str) -> BuildGuard {
        let entry = LockEntry::new(&self.build_locks, key);
        let guard = Arc::clone(&entry.lock).lock_owned().await;
        BuildGuard {
            _guard: guard,
            _entry: entry,
        }
    }

    #[cfg(test)]
    fn pending_locks(&self) -> usize {
        lock_table(&self.build_locks).len()
    }
}

fn lock_table(table: &LockTable) -> MutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One reference to a key's lock, held by a waiter or a guard.
struct LockEntry {
    table: LockTable,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl LockEntry {
    fn new(table: &LockTable, key: &str) -> Self {
        let lock = Arc::clone(lock_table(table).entry(key.to_string()).or_default());
        Self {
            table: Arc::clone(table),
            key: key.to_string(),
            lock,
        }
    }
}

impl Drop for LockEntry {
    fn drop(&mut self) {
        let mut locks = lock_table(&self.table);
        // one reference here, one in the table: nobody else holds or waits
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.key);
        }
    }
}

/// Held while a task loads or builds the index for one key. Dropping it
/// releases the lock.
pub struct BuildGuard {
    // fields drop in order: release the mutex before pruning the entry
    _guard: OwnedMutexGuard<()>,
    _entry: LockEntry,
}
