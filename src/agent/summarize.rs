use super::{AgentContext, AgentOutput, Dispatcher, prompts};
use crate::error::{Error, Result};

pub(super) async fn run(agent: &Dispatcher, ctx: &AgentContext) -> Result<AgentOutput> {
    if ctx.document_text.trim().is_empty() {
        return Err(Error::Validation(
            "No document found to summarize.".to_string(),
        ));
    }

    let summary = agent
        .complete(&prompts::summarize(&ctx.document_text))
        .await?;
    Ok(AgentOutput::Text(summary))
}
