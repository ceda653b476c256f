//! Context retrieval for chat questions.
//!
//! Each document's index is looked up in three tiers, in order: the process
//! memory cache, the persisted index store, and finally a fresh build from the
//! document text. Whatever a lower tier produces is promoted to the tiers above
//! it before it is returned. Loads and builds for one document are serialized
//! by a per-document lock, so concurrent misses share a single build.
pub mod cache;

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::indexer::Indexer;
use crate::vector::VectorIndex;
use crate::vector::store::IndexStore;

pub use cache::IndexCache;

/// Which tier satisfied an index lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    Memory,
    Store,
    Built,
}

pub struct Retriever {
    indexer: Indexer,
    store: Arc<dyn IndexStore>,
    cache: IndexCache,
    // deleted documents; ids are never reused
    forgotten: StdMutex<HashSet<String>>,
}

impl Retriever {
    pub fn new(indexer: Indexer, store: Arc<dyn IndexStore>) -> Self {
        Self {
            indexer,
            store,
            cache: IndexCache::new(),
            forgotten: StdMutex::new(HashSet::new()),
        }
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub fn cache(&self) -> &IndexCache {
        &self.cache
    }

    /// Return the index for `document_id`, loading or building it if needed.
    pub async fn ensure_index(
        &self,
        document_id: &str,
        text: &str,
    ) -> Result<(Arc<VectorIndex>, IndexSource)> {
        if let Some(index) = self.cache.get(document_id).await {
            return Ok((index, IndexSource::Memory));
        }

        // shared with the blocking build, which may outlive this call
        let guard = Arc::new(self.cache.build_lock(document_id).await);

        // another task may have finished while we waited for the lock
        if let Some(index) = self.cache.get(document_id).await {
            return Ok((index, IndexSource::Memory));
        }
        if self.is_forgotten(document_id) {
            return Err(Error::NotFound(format!("document {document_id}")));
        }

        if let Some(index) = self.load_persisted(document_id).await {
            let index = Arc::new(index);
            self.cache.insert(document_id, Arc::clone(&index)).await;
            debug!("Loaded index for {document_id} from {}", self.store.name());
            return Ok((index, IndexSource::Store));
        }

        let index = self
            .indexer
            .build_index_holding(text, Arc::clone(&guard))
            .await?;
        let index = Arc::new(index);
        if let Err(e) = self.store.persist(document_id, &index).await {
            warn!("Failed to persist index for {document_id}: {e}");
        }
        self.cache.insert(document_id, Arc::clone(&index)).await;
        info!(
            "Built index for {document_id} ({} chunks)",
            index.len()
        );
        Ok((index, IndexSource::Built))
    }

    /// A persisted index usable with the active embedder, if any. Storage
    /// failures and dimension mismatches count as misses.
    async fn load_persisted(&self, document_id: &str) -> Option<VectorIndex> {
        match self.store.load(document_id).await {
            Ok(Some(index)) => {
                let expected = self.indexer.embedder().dimensions();
                if index.dimensions() == expected {
                    Some(index)
                } else {
                    warn!(
                        "Ignoring persisted index for {document_id}: {} dimensions, embedder produces {expected}",
                        index.dimensions()
                    );
                    None
                }
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to load persisted index for {document_id}: {e}");
                None
            }
        }
    }

    /// Retrieve the `k` chunks most relevant to `query`, joined by blank lines
    /// in rank order. Empty when the document has no chunks.
    pub async fn get_context(
        &self,
        document_id: &str,
        text: &str,
        query: &str,
        k: usize,
    ) -> Result<String> {
        let (index, source) = self.ensure_index(document_id, text).await?;
        debug!("Searching index for {document_id} (source: {source:?})");
        let chunks = self.indexer.search(index, query, k).await?;
        Ok(chunks.join("\n\n"))
    }

    /// Drop every copy of the index for a deleted document. Later lookups
    /// for it fail with `NotFound` instead of rebuilding.
    pub async fn forget(&self, document_id: &str) -> Result<()> {
        // wait out any in-flight build so it cannot re-publish afterwards
        let _guard = self.cache.build_lock(document_id).await;
        self.forgotten_ids().insert(document_id.to_string());
        self.cache.invalidate(document_id).await;
        self.store.delete(document_id).await?;
        Ok(())
    }

    fn is_forgotten(&self, document_id: &str) -> bool {
        self.forgotten_ids().contains(document_id)
    }

    fn forgotten_ids(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.forgotten
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
