use chrono::{DateTime, Utc};
use serde::Serialize;

/// An uploaded document with its extracted text.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub document_id: String,
    pub user_id: String,
    pub filename: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Listing row for a user's documents; omits the text.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub user_query: String,
    pub ai_response: String,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    /// The form prior turns take inside prompts.
    #[must_use]
    pub fn history_line(&self) -> String {
        format!("User: {}\nAI: {}", self.user_query, self.ai_response)
    }
}

/// A generated narration, at most one per (user, document).
#[derive(Debug, Clone, Serialize)]
pub struct VoiceNote {
    pub audio_url: String,
    pub script: String,
    pub created_at: DateTime<Utc>,
}
