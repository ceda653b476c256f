/// ONNX Runtime embedder using the `ort` crate.
///
/// Loads the all-MiniLM-L6-v2 sentence-transformer exported to ONNX, runs
/// padded batch inference, applies attention-masked mean pooling and
/// L2-normalizes each sentence vector.
use std::path::Path;
use std::sync::Mutex;

use ort::session::Session;
use ort::value::Tensor;
use tracing::{debug, info};

use super::tokenizer::{BertTokenizer, TokenizerOutput};
use super::{Embedder, EmbedderError, l2_normalize};

/// ONNX-backed embedder implementing the `Embedder` trait.
pub struct OnnxEmbedder {
    session: Mutex<Session>,
    tokenizer: BertTokenizer,
    dimensions: usize,
}

impl OnnxEmbedder {
    /// Create a new `OnnxEmbedder` by loading a model from the given directory.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in `model_dir`. `dimensions`
    /// must equal the model's hidden size (384 for MiniLM-L6).
    pub fn new(model_dir: &Path, dimensions: usize) -> Result<Self, EmbedderError> {
        let model_path = model_dir.join("model.onnx");

        if !model_path.exists() {
            return Err(EmbedderError::ModelLoadFailed(format!(
                "model.onnx not found in {}",
                model_dir.display()
            )));
        }

        info!("Initializing ONNX Runtime...");

        let session = Session::builder()
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("session builder error: {e}")))?
            .with_intra_threads(4)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("thread config error: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("model load error: {e}")))?;

        let tokenizer = BertTokenizer::from_model_dir(model_dir)
            .map_err(|e| EmbedderError::ModelLoadFailed(format!("tokenizer error: {e}")))?;

        info!(
            "ONNX model loaded (vocab size: {}, max length: {})",
            tokenizer.vocab_size(),
            tokenizer.max_length()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions,
        })
    }

    /// Run one forward pass over an already padded batch.
    fn run_batch(&self, batch: &[TokenizerOutput]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        let rows = batch.len();
        let seq_len = batch.iter().map(|t| t.input_ids.len()).max().unwrap_or(0);
        if rows == 0 || seq_len == 0 {
            return Ok(Vec::new());
        }

        // Flatten to [rows, seq_len]; the tokenizer pads to the batch longest,
        // this guards against any row that came back shorter.
        let mut input_ids = Vec::with_capacity(rows * seq_len);
        let mut attention_mask = Vec::with_capacity(rows * seq_len);
        for tokens in batch {
            let pad = seq_len - tokens.input_ids.len();
            input_ids.extend_from_slice(&tokens.input_ids);
            input_ids.extend(std::iter::repeat_n(0i64, pad));
            attention_mask.extend_from_slice(&tokens.attention_mask);
            attention_mask.extend(std::iter::repeat_n(0i64, pad));
        }

        let input_ids_val = Tensor::from_array(([rows, seq_len], input_ids))
            .map_err(|e| EmbedderError::InferenceFailed(format!("input_ids error: {e}")))?;
        let attention_mask_val = Tensor::from_array(([rows, seq_len], attention_mask.clone()))
            .map_err(|e| EmbedderError::InferenceFailed(format!("attention_mask error: {e}")))?;
        let token_type_ids_val = Tensor::from_array(([rows, seq_len], vec![0i64; rows * seq_len]))
            .map_err(|e| EmbedderError::InferenceFailed(format!("token_type_ids error: {e}")))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| EmbedderError::InferenceFailed(format!("lock poisoned: {e}")))?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_val,
                "attention_mask" => attention_mask_val,
                "token_type_ids" => token_type_ids_val,
            ])
            .map_err(|e| EmbedderError::InferenceFailed(format!("inference failed: {e}")))?;

        // Output 0: last_hidden_state with shape [rows, seq_len, hidden]
        let (_shape, hidden_data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("output extraction: {e}")))?;

        let expected = rows * seq_len * self.dimensions;
        if hidden_data.len() != expected {
            return Err(EmbedderError::DimensionMismatch {
                expected,
                actual: hidden_data.len(),
            });
        }

        let row_stride = seq_len * self.dimensions;
        let vectors = (0..rows)
            .map(|r| {
                let mut pooled = mean_pooling(
                    &hidden_data[r * row_stride..(r + 1) * row_stride],
                    &attention_mask[r * seq_len..(r + 1) * seq_len],
                    self.dimensions,
                );
                l2_normalize(&mut pooled);
                pooled
            })
            .collect();

        Ok(vectors)
    }
}

impl Embedder for OnnxEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut vectors = self.embed_batch(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| EmbedderError::InferenceFailed("no output for input".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        const BATCH: usize = 32;

        let mut vectors = Vec::with_capacity(texts.len());
        for window in texts.chunks(BATCH) {
            let tokens = self
                .tokenizer
                .tokenize_batch(window)
                .map_err(|e| EmbedderError::TokenizerError(e.to_string()))?;
            vectors.extend(self.run_batch(&tokens)?);
        }
        debug!("Embedded {} texts with ONNX", vectors.len());
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// Average of the token vectors whose attention mask is set.
///
/// `hidden` is one row of `last_hidden_state`, flat `[tokens, hidden_size]`.
fn mean_pooling(hidden: &[f32], attention_mask: &[i64], hidden_size: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden_size];
    let mut kept = 0usize;

    for (token, &mask) in hidden.chunks_exact(hidden_size).zip(attention_mask) {
        if mask == 0 {
            continue;
        }
        kept += 1;
        pooled.iter_mut().zip(token).for_each(|(acc, v)| *acc += v);
    }

    if kept > 0 {
        let scale = 1.0 / kept as f32;
        pooled.iter_mut().for_each(|v| *v *= scale);
    }
    pooled
}
