//! Per-document vector index.
//!
//! An index is an insertion-ordered list of (chunk text, embedding) entries
//! searched exhaustively by cosine similarity. Documents are small enough that
//! an exact scan beats maintaining an approximate structure.
pub mod store;

use crate::embedder::Embedder;
use crate::error::{Error, Result};

/// One indexed chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub text: String,
    pub vector: Vec<f32>,
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
    /// Insertion position of the chunk within its document.
    pub position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// An empty index for vectors of the given dimensionality.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: Vec::new(),
        }
    }

    /// Rebuild an index from stored entries, checking every vector's length.
    pub fn from_entries(dimensions: usize, entries: Vec<IndexEntry>) -> Result<Self> {
        if let Some(bad) = entries.iter().find(|e| e.vector.len() != dimensions) {
            return Err(Error::Storage(format!(
                "index entry has {} dimensions, expected {dimensions}",
                bad.vector.len()
            )));
        }
        Ok(Self {
            dimensions,
            entries,
        })
    }

    /// Embed every chunk with one batch call and store the pairs in order.
    ///
    /// Zero chunks produce a valid empty index without touching the embedder.
    /// Any embedding failure aborts the whole build.
    pub fn build(embedder: &dyn Embedder, chunks: Vec<String>) -> Result<Self> {
        let dimensions = embedder.dimensions();
        if chunks.is_empty() {
            return Ok(Self::new(dimensions));
        }

        let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
        let vectors = embedder.embed_batch(&refs)?;
        if vectors.len() != chunks.len() {
            return Err(Error::provider(
                embedder.name(),
                format!(
                    "returned {} vectors for {} chunks",
                    vectors.len(),
                    chunks.len()
                ),
            ));
        }

        let entries = chunks
            .into_iter()
            .zip(vectors)
            .map(|(text, vector)| {
                if vector.len() == dimensions {
                    Ok(IndexEntry { text, vector })
                } else {
                    Err(Error::provider(
                        embedder.name(),
                        format!(
                            "returned a {}-dimensional vector, expected {dimensions}",
                            vector.len()
                        ),
                    ))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            dimensions,
            entries,
        })
    }

    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Embed `query` and return the texts of the `k` most similar chunks.
    pub fn search(&self, embedder: &dyn Embedder, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self
            .search_scored(embedder, query, k)?
            .into_iter()
            .map(|hit| hit.text)
            .collect())
    }

    /// Like [`search`](Self::search) but keeps scores and positions.
    pub fn search_scored(
        &self,
        embedder: &dyn Embedder,
        query: &str,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be positive".to_string()));
        }
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = embedder.embed(query)?;
        if query_vector.len() != self.dimensions {
            return Err(Error::provider(
                embedder.name(),
                format!(
                    "query vector has {} dimensions, index has {}",
                    query_vector.len(),
                    self.dimensions
                ),
            ));
        }
        self.search_by_vector(&query_vector, k)
    }

    /// Rank stored entries against a precomputed query vector.
    ///
    /// Higher similarity first; equal scores keep insertion order.
    pub fn search_by_vector(&self, query_vector: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Err(Error::InvalidArgument("k must be positive".to_string()));
        }

        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| SearchHit {
                text: entry.text.clone(),
                score: cosine_similarity(&entry.vector, query_vector),
                position,
            })
            .collect();

        // sort_by is stable, which gives the insertion-order tie-break
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}

/// Cosine similarity; 0.0 when either vector has zero magnitude or the
/// result is not finite.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let score = dot / (norm_a * norm_b);
    if score.is_finite() { score } else { 0.0 }
}
