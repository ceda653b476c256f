/// Embedder trait and shared types for text embedding.
///
/// One embedder backs every index in a running process; which backend that is
/// comes from `EmbeddingConfig::backend`.
pub mod download;
pub mod mock;
pub mod onnx;
pub mod remote;
pub mod tokenizer;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::info;

use crate::config::{EmbeddingBackend, EmbeddingConfig};

/// Errors that can occur during embedding operations.
#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    #[error("model load failed: {0}")]
    ModelLoadFailed(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("expected {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for text embedding implementations.
///
/// Calls may block for a long time (local inference or a blocking HTTP
/// round-trip); async callers run them on the blocking pool.
/// All implementations must be `Send + Sync` to allow concurrent use
/// behind `Arc`.
pub trait Embedder: Send + Sync {
    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed multiple text strings into vectors, all or nothing.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Return the dimensionality of the embedding vectors.
    fn dimensions(&self) -> usize;

    /// Short backend name used in logs and error messages.
    fn name(&self) -> &str;
}

/// Construct the embedder selected by configuration.
///
/// May download model files, so call it from a blocking context.
pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    let embedder: Arc<dyn Embedder> = match config.backend {
        EmbeddingBackend::Mock => Arc::new(mock::MockEmbedder::new(config.dimensions)),
        EmbeddingBackend::Onnx => {
            let model_dir = Path::new(&config.model_dir);
            download::download_model_files(model_dir)?;
            let embedder = onnx::OnnxEmbedder::new(model_dir, config.dimensions)
                .context("failed to initialize ONNX embedder")?;
            Arc::new(embedder)
        }
        EmbeddingBackend::Remote => Arc::new(remote::RemoteEmbedder::from_config(config)?),
    };

    info!(
        "Embedder ready: {} ({} dimensions)",
        embedder.name(),
        embedder.dimensions()
    );
    Ok(embedder)
}

/// L2-normalize a vector in place. Zero vectors are left untouched.
pub(crate) fn l2_normalize(vec: &mut [f32]) {
    let norm_sq: f32 = vec.iter().map(|v| v * v).sum();
    if norm_sq > 0.0 {
        let inv = 1.0 / norm_sq.sqrt();
        for v in vec.iter_mut() {
            *v *= inv;
        }
    }
}
