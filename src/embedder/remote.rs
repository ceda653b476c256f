/// Remote embedder speaking the OpenAI-compatible `/embeddings` protocol.
///
/// Uses the blocking `reqwest` client, so it must only be driven from the
/// blocking pool. The client is created lazily on first use for the same
/// reason.
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::{Embedder, EmbedderError};
use crate::config::EmbeddingConfig;

pub struct RemoteEmbedder {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
    timeout: Duration,
    client: OnceLock<reqwest::blocking::Client>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

impl RemoteEmbedder {
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        dimensions: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            api_key,
            dimensions,
            timeout,
            client: OnceLock::new(),
        }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        anyhow::ensure!(
            !config.endpoint.is_empty(),
            "embedding.endpoint is required for the remote backend"
        );
        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());
        Ok(Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            api_key,
            config.dimensions,
            Duration::from_secs(config.timeout_secs),
        ))
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, EmbedderError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| EmbedderError::RequestFailed(format!("client build failed: {e}")))?;
        Ok(self.client.get_or_init(|| client))
    }

    /// Order vectors by their reported index and check every dimension.
    fn collect_vectors(
        &self,
        mut data: Vec<EmbeddingData>,
        expected_count: usize,
    ) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if data.len() != expected_count {
            return Err(EmbedderError::InferenceFailed(format!(
                "expected {expected_count} embeddings, got {}",
                data.len()
            )));
        }
        data.sort_by_key(|d| d.index);

        data.into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimensions {
                    Ok(d.embedding)
                } else {
                    Err(EmbedderError::DimensionMismatch {
                        expected: self.dimensions,
                        actual: d.embedding.len(),
                    })
                }
            })
            .collect()
    }
}

impl Embedder for RemoteEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut vectors = self.embed_batch(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| EmbedderError::InferenceFailed("empty embedding response".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client()?.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| EmbedderError::RequestFailed(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(EmbedderError::RequestFailed(format!("{status}: {body}")));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .map_err(|e| EmbedderError::InferenceFailed(format!("invalid response: {e}")))?;
        self.collect_vectors(parsed.data, texts.len())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "remote"
    }
}
