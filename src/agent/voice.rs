//! Narrated explanation of a document, generated once per (user, document).
use tracing::info;

use super::{AgentContext, AgentOutput, Dispatcher, VoiceResult, prompts};
use crate::deadline;
use crate::error::{Error, Result};

pub(super) async fn run(agent: &Dispatcher, ctx: &AgentContext) -> Result<AgentOutput> {
    let document_id = ctx.require_document_id()?;
    let services = agent.services();

    let cached = {
        let db = services.db.lock().await;
        db.get_voice_note(&ctx.user_id, document_id)?
    };
    if let Some(note) = cached {
        return Ok(AgentOutput::Voice(VoiceResult {
            audio_url: note.audio_url,
            script: note.script,
            cached: true,
        }));
    }

    if ctx.document_text.trim().is_empty() {
        return Err(Error::Validation(
            "No document found to generate voice explanation.".to_string(),
        ));
    }

    let script = agent
        .complete(&prompts::voice(&ctx.document_text))
        .await?
        .trim()
        .to_string();

    let tts = &services.tts;
    let audio = deadline::with_timeout(
        tts.name(),
        agent.settings().tts_timeout,
        tts.synthesize(&script),
    )
    .await?;
    let audio_url = services.audio.save(&audio).await?;

    {
        let db = services.db.lock().await;
        db.upsert_voice_note(&ctx.user_id, document_id, &audio_url, &script)?;
    }
    info!("Generated voice note {audio_url} for {document_id}");

    Ok(AgentOutput::Voice(VoiceResult {
        audio_url,
        script,
        cached: false,
    }))
}
