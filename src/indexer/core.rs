use crate::deadline;
use crate::embedder::Embedder;
use crate::error::Result;
use crate::indexer::chunker::TextChunker;
use crate::vector::VectorIndex;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Chunks document text and embeds the chunks into a [`VectorIndex`].
///
/// Embedding is blocking work, so builds run on the blocking pool under the
/// configured embedding timeout. A failed or timed-out build yields no index
/// at all; callers never see a partially embedded one.
#[derive(Clone)]
pub struct Indexer {
    embedder: Arc<dyn Embedder>,
    chunker: TextChunker,
    timeout: Duration,
}

impl Indexer {
    pub fn new(embedder: Arc<dyn Embedder>, chunker: TextChunker, timeout: Duration) -> Self {
        Self {
            embedder,
            chunker,
            timeout,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn chunker(&self) -> &TextChunker {
        &self.chunker
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Build an index for `text`. Blank text gives an empty index without
    /// calling the embedder.
    pub async fn build_index(&self, text: &str) -> Result<VectorIndex> {
        self.build_index_holding(text, ()).await
    }

    /// Like [`build_index`](Self::build_index), but `hold` moves into the
    /// blocking job and is dropped only when the embedding work ends, even if
    /// the caller stopped waiting at the timeout.
    pub async fn build_index_holding<H>(&self, text: &str, hold: H) -> Result<VectorIndex>
    where
        H: Send + 'static,
    {
        let chunks = self.chunker.split(text);
        debug!(
            "Embedding {} chunks with {}",
            chunks.len(),
            self.embedder.name()
        );
        if chunks.is_empty() {
            return Ok(VectorIndex::new(self.embedder.dimensions()));
        }

        let embedder = Arc::clone(&self.embedder);
        deadline::run_blocking(self.embedder.name(), self.timeout, move || {
            let _hold = hold;
            VectorIndex::build(embedder.as_ref(), chunks)
        })
        .await
    }

    /// Search `index` for `query` on the blocking pool.
    pub async fn search(&self, index: Arc<VectorIndex>, query: &str, k: usize) -> Result<Vec<String>> {
        if k == 0 || index.is_empty() {
            // no embedding needed; search reports the k == 0 error itself
            return index.search(self.embedder.as_ref(), query, k);
        }

        let embedder = Arc::clone(&self.embedder);
        let query = query.to_string();
        deadline::run_blocking(self.embedder.name(), self.timeout, move || {
            index.search(embedder.as_ref(), &query, k)
        })
        .await
    }
}
