//! Agent dispatcher: routes a request to the handler for its mode.
//!
//! Handlers never call each other. Each returns a [`Result`]; the dispatcher
//! turns validation errors into user-facing messages and every other error
//! into a failure result, so a dispatch always produces an [`AgentOutput`].
mod chat;
mod doubt;
pub mod prompts;
mod reference;
mod summarize;
mod voice;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::SharedDb;
use crate::deadline;
use crate::error::{Error, Result};
use crate::llm::LanguageModel;
use crate::retrieval::Retriever;
use crate::search::{Reference, ReferenceSearch};
use crate::speech::{AudioStore, SpeechSynthesizer};

pub use prompts::NOT_FOUND_SENTINEL;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentMode {
    Chat,
    Summarize,
    Voice,
    Reference,
    Doubt,
}

impl AgentMode {
    pub const ALL: [AgentMode; 5] = [
        AgentMode::Chat,
        AgentMode::Summarize,
        AgentMode::Voice,
        AgentMode::Reference,
        AgentMode::Doubt,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AgentMode::Chat => "chat",
            AgentMode::Summarize => "summarize",
            AgentMode::Voice => "voice",
            AgentMode::Reference => "reference",
            AgentMode::Doubt => "doubt",
        }
    }

    /// Every mode except `doubt` works on an uploaded document.
    #[must_use]
    pub fn requires_document(self) -> bool {
        self != AgentMode::Doubt
    }
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AgentMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = AgentMode::ALL.iter().map(|m| m.as_str()).collect();
                Error::Validation(format!(
                    "Invalid agent_type. Use one of: [{}]",
                    names.join(", ")
                ))
            })
    }
}

/// Everything a handler may read about the request.
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    pub user_id: String,
    pub document_id: Option<String>,
    /// Extracted document text; empty when the mode needs no document.
    pub document_text: String,
    pub query: String,
    /// Prior turns, each formatted as `"User: <q>\nAI: <a>"`.
    pub chat_history: Vec<String>,
}

impl AgentContext {
    fn require_document_id(&self) -> Result<&str> {
        self.document_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::Validation("document_id is required".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceResult {
    pub audio_url: String,
    pub script: String,
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceResult {
    pub websites: Vec<Reference>,
    pub youtube: Vec<Reference>,
}

/// What a dispatch produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AgentOutput {
    /// An answer, or a user-facing message for invalid input.
    Text(String),
    Voice(VoiceResult),
    References(ReferenceResult),
    /// The request could not be served.
    #[serde(skip)]
    Failure(String),
}

impl AgentOutput {
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, AgentOutput::Failure(_))
    }
}

/// Collaborators shared by all handlers.
#[derive(Clone)]
pub struct AgentServices {
    pub db: SharedDb,
    pub retriever: Arc<Retriever>,
    pub llm: Arc<dyn LanguageModel>,
    pub tts: Arc<dyn SpeechSynthesizer>,
    pub audio: AudioStore,
    pub search: Arc<dyn ReferenceSearch>,
}

/// Tunables and per-collaborator time limits.
#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub top_k: usize,
    pub web_results: usize,
    pub video_results: usize,
    pub llm_timeout: Duration,
    pub tts_timeout: Duration,
    pub search_timeout: Duration,
}

impl AgentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            top_k: config.retrieval_top_k,
            web_results: config.search.web_results,
            video_results: config.search.video_results,
            llm_timeout: Duration::from_secs(config.llm.timeout_secs),
            tts_timeout: Duration::from_secs(config.tts.timeout_secs),
            search_timeout: Duration::from_secs(config.search.timeout_secs),
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct Dispatcher {
    services: AgentServices,
    settings: AgentSettings,
}

impl Dispatcher {
    pub fn new(services: AgentServices, settings: AgentSettings) -> Self {
        Self { services, settings }
    }

    pub fn services(&self) -> &AgentServices {
        &self.services
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    /// Run the handler for `mode`. Unknown modes fail without side effects.
    pub async fn dispatch(&self, mode: &str, ctx: &AgentContext) -> AgentOutput {
        let mode = match mode.parse::<AgentMode>() {
            Ok(mode) => mode,
            Err(e) => return AgentOutput::Failure(e.to_string()),
        };

        info!("Dispatching {mode} for user {}", ctx.user_id);
        let result = match mode {
            AgentMode::Chat => chat::run(self, ctx).await,
            AgentMode::Summarize => summarize::run(self, ctx).await,
            AgentMode::Voice => voice::run(self, ctx).await,
            AgentMode::Reference => reference::run(self, ctx).await,
            AgentMode::Doubt => doubt::run(self, ctx).await,
        };

        match result {
            Ok(output) => output,
            Err(Error::Validation(message)) => AgentOutput::Text(message),
            Err(e) => {
                warn!("{mode} handler failed: {e}");
                AgentOutput::Failure(format!("Agent execution failed: {e}"))
            }
        }
    }

    /// Ask the language model, bounded by the configured timeout.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let llm = &self.services.llm;
        deadline::with_timeout(llm.name(), self.settings.llm_timeout, llm.complete(prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("chat".parse::<AgentMode>().unwrap(), AgentMode::Chat);
        assert_eq!("doubt".parse::<AgentMode>().unwrap(), AgentMode::Doubt);
        for mode in AgentMode::ALL {
            assert_eq!(mode.as_str().parse::<AgentMode>().unwrap(), mode);
        }
    }

    #[test]
    fn test_mode_parse_rejects_unknown() {
        let err = "translate".parse::<AgentMode>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid agent_type. Use one of: [chat, summarize, voice, reference, doubt]"
        );
        // case-sensitive
        assert!("Chat".parse::<AgentMode>().is_err());
    }

    #[test]
    fn test_requires_document() {
        assert!(AgentMode::Chat.requires_document());
        assert!(!AgentMode::Doubt.requires_document());
    }

    #[test]
    fn test_output_serialization() {
        let text = serde_json::to_value(AgentOutput::Text("hi".to_string())).unwrap();
        assert_eq!(text, serde_json::json!("hi"));

        let voice = serde_json::to_value(AgentOutput::Voice(VoiceResult {
            audio_url: "/static/audio/a.mp3".to_string(),
            script: "script".to_string(),
            cached: true,
        }))
        .unwrap();
        assert_eq!(voice["cached"], true);

        let refs = serde_json::to_value(AgentOutput::References(ReferenceResult {
            websites: Vec::new(),
            youtube: Vec::new(),
        }))
        .unwrap();
        assert_eq!(refs, serde_json::json!({"websites": [], "youtube": []}));
    }
}
