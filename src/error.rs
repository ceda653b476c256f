//! Error kinds shared by the retrieval pipeline, the persistence layer and
//! the agent handlers.
use thiserror::Error;

use crate::embedder::EmbedderError;

/// Errors surfaced by the library.
///
/// `Validation` messages are written for end users and are passed through
/// verbatim by the dispatcher; the other kinds get a short prefix.
#[derive(Error, Debug)]
pub enum Error {
    /// A required field is missing or blank (empty query, missing document).
    #[error("{0}")]
    Validation(String),

    /// A document or persisted index does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An embedding, language-model, speech or search backend failed or timed out.
    #[error("provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    /// A caller passed an argument outside its domain (e.g. `k == 0`).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reading or writing durable state failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<EmbedderError> for Error {
    fn from(e: EmbedderError) -> Self {
        Self::provider("embedder", e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
