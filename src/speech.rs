//! Text-to-speech and storage of the generated audio.
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::config::TtsConfig;
use crate::error::{Error, Result};

/// Converts narration text into MP3 bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    fn name(&self) -> &str;
}

const PROVIDER: &str = "google-tts";
const TTS_URL: &str = "https://translate.google.com/translate_tts";

/// The endpoint rejects longer inputs.
const MAX_PIECE_CHARS: usize = 100;

/// Google Translate's speech endpoint. Text is sent in short pieces whose MP3
/// frames are concatenated, which players handle as one stream.
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    language: String,
}

impl GoogleTranslateTts {
    pub fn new(language: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0")
            .build()
            .map_err(|e| Error::provider(PROVIDER, format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            language: language.into(),
        })
    }

    pub fn from_config(config: &TtsConfig) -> Result<Self> {
        Self::new(
            config.language.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    async fn fetch_piece(&self, piece: &str, idx: usize, total: usize) -> Result<Vec<u8>> {
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = piece.chars().count().to_string();
        let response = self
            .client
            .get(TTS_URL)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", self.language.as_str()),
                ("q", piece),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::provider(
                PROVIDER,
                format!("synthesis failed ({})", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("failed to read audio: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let pieces = split_for_tts(text, MAX_PIECE_CHARS);
        if pieces.is_empty() {
            return Err(Error::Validation("Nothing to narrate.".to_string()));
        }

        debug!("Synthesizing {} pieces", pieces.len());
        let mut audio = Vec::new();
        for (idx, piece) in pieces.iter().enumerate() {
            audio.extend(self.fetch_piece(piece, idx, pieces.len()).await?);
        }
        Ok(audio)
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

/// Split `text` into pieces of at most `max_chars` characters, breaking at
/// whitespace. Words longer than the limit are cut.
pub fn split_for_tts(text: &str, max_chars: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > max_chars {
            if !current.is_empty() {
                pieces.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            pieces.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > max_chars {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Writes generated audio below the static directory and hands out the
/// public URL it is served from.
#[derive(Debug, Clone)]
pub struct AudioStore {
    dir: PathBuf,
}

impl AudioStore {
    /// `static_dir` is the directory mounted at `/static`.
    pub fn new(static_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: static_dir.as_ref().join("audio"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store `audio` under a fresh name; returns `/static/audio/<uuid>.mp3`.
    pub async fn save(&self, audio: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let filename = format!("{}.mp3", Uuid::new_v4());
        tokio::fs::write(self.dir.join(&filename), audio).await?;
        Ok(format!("/static/audio/{filename}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_respects_limit() {
        let text = "Gravity is the force by which a planet or other body draws objects toward its center. "
            .repeat(10);
        let pieces = split_for_tts(&text, 100);
        assert!(pieces.len() > 1);
        for piece in &pieces {
            assert!(piece.chars().count() <= 100, "piece too long: {piece}");
            assert!(!piece.starts_with(' ') && !piece.ends_with(' '));
        }
        assert_eq!(
            pieces.join(" "),
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        );
    }

    #[test]
    fn test_split_long_word() {
        let word = "x".repeat(250);
        let pieces = split_for_tts(&format!("a {word} b"), 100);
        assert_eq!(pieces.len(), 4);
        assert_eq!(pieces[0], "a");
        assert_eq!(pieces[1].len(), 100);
        assert_eq!(pieces[2].len(), 100);
        assert_eq!(pieces[3], format!("{} b", "x".repeat(50)));
    }

    #[test]
    fn test_split_blank() {
        assert!(split_for_tts("  \n ", 100).is_empty());
    }

    #[tokio::test]
    async fn test_audio_store_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioStore::new(dir.path());
        let url = store.save(b"ID3fake").await.unwrap();

        assert!(url.starts_with("/static/audio/"));
        assert!(url.ends_with(".mp3"));
        let filename = url.trim_start_matches("/static/audio/");
        let written = std::fs::read(dir.path().join("audio").join(filename)).unwrap();
        assert_eq!(written, b"ID3fake");
    }
}
