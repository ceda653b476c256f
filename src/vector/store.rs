//! Durable homes for built indexes, keyed by document id.
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::VectorIndex;
use crate::db::SharedDb;
use crate::error::Result;

#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Write `index` under `key`, replacing any previous one atomically.
    async fn persist(&self, key: &str, index: &VectorIndex) -> Result<()>;

    /// Read the index under `key`; `None` when nothing was persisted.
    async fn load(&self, key: &str) -> Result<Option<VectorIndex>>;

    /// Remove the index under `key`. Returns false when absent.
    async fn delete(&self, key: &str) -> Result<bool>;

    fn name(&self) -> &str;
}

/// Indexes stored in the application database.
pub struct SqliteIndexStore {
    db: SharedDb,
}

impl SqliteIndexStore {
    pub fn new(db: SharedDb) -> Self {
        Self { db }
    }
}

#[async_trait]
impl IndexStore for SqliteIndexStore {
    async fn persist(&self, key: &str, index: &VectorIndex) -> Result<()> {
        let mut db = self.db.lock().await;
        db.save_index(key, index)?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<VectorIndex>> {
        let db = self.db.lock().await;
        db.load_index(key)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let db = self.db.lock().await;
        Ok(db.delete_index(key)?)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

/// Process-local store; contents vanish on restart.
#[derive(Default)]
pub struct MemoryIndexStore {
    indexes: RwLock<HashMap<String, VectorIndex>>,
}

impl MemoryIndexStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexStore for MemoryIndexStore {
    async fn persist(&self, key: &str, index: &VectorIndex) -> Result<()> {
        self.indexes
            .write()
            .await
            .insert(key.to_string(), index.clone());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<VectorIndex>> {
        Ok(self.indexes.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.indexes.write().await.remove(key).is_some())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
