//! Retrieval-grounded question answering over one document.
use tracing::warn;

use super::{AgentContext, AgentOutput, Dispatcher, prompts};
use crate::error::{Error, Result};

pub(super) async fn run(agent: &Dispatcher, ctx: &AgentContext) -> Result<AgentOutput> {
    if ctx.document_text.trim().is_empty() {
        return Err(Error::Validation(
            "No document text provided. Please upload a document.".to_string(),
        ));
    }
    if ctx.query.trim().is_empty() {
        return Err(Error::Validation("Please ask a question.".to_string()));
    }
    let document_id = ctx.require_document_id()?;

    let services = agent.services();
    let context = services
        .retriever
        .get_context(
            document_id,
            &ctx.document_text,
            &ctx.query,
            agent.settings().top_k,
        )
        .await?;

    let answer = agent
        .complete(&prompts::chat(&context, &ctx.query))
        .await?;

    let logged = {
        let db = services.db.lock().await;
        // the document may have been deleted while the answer was generated
        if db.get_document(&ctx.user_id, document_id)?.is_none() {
            return Err(Error::NotFound(format!("document {document_id}")));
        }
        db.append_turn(&ctx.user_id, document_id, &ctx.query, &answer)
    };
    if let Err(e) = logged {
        warn!("Failed to record chat turn for {document_id}: {e}");
    }

    Ok(AgentOutput::Text(answer))
}
