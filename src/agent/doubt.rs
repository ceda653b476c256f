use super::{AgentContext, AgentOutput, Dispatcher, prompts};
use crate::error::{Error, Result};

/// Free-form clarification from the question and prior turns; no retrieval.
pub(super) async fn run(agent: &Dispatcher, ctx: &AgentContext) -> Result<AgentOutput> {
    if ctx.query.trim().is_empty() {
        return Err(Error::Validation("Please ask a question.".to_string()));
    }

    let answer = agent
        .complete(&prompts::doubt(&ctx.chat_history, &ctx.query))
        .await?;
    Ok(AgentOutput::Text(answer))
}
