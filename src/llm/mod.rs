//! Language-model collaborator.
pub mod gemini;

use async_trait::async_trait;

use crate::error::Result;

pub use gemini::GeminiClient;

/// Text completion backend. Calls are slow and may fail; callers bound them
/// with a timeout.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;

    fn name(&self) -> &str;
}
