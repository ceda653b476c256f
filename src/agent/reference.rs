//! Further-reading links for a topic.
use tracing::warn;

use super::{AgentContext, AgentOutput, Dispatcher, ReferenceResult};
use crate::deadline;
use crate::error::Result;
use crate::search::{Reference, is_video_link};

pub(super) async fn run(agent: &Dispatcher, ctx: &AgentContext) -> Result<AgentOutput> {
    let topic = ctx.query.trim();
    if topic.is_empty() {
        return Ok(AgentOutput::References(ReferenceResult {
            websites: Vec::new(),
            youtube: Vec::new(),
        }));
    }

    let search = &agent.services().search;
    let settings = agent.settings();
    let (websites, videos) = tokio::join!(
        deadline::with_timeout(
            search.name(),
            settings.search_timeout,
            search.web_search(topic, settings.web_results),
        ),
        deadline::with_timeout(
            search.name(),
            settings.search_timeout,
            search.video_search(topic, settings.video_results),
        ),
    );

    let mut websites = or_empty("web", websites);
    websites.truncate(settings.web_results);
    let youtube = or_empty("video", videos)
        .into_iter()
        .filter(|r| is_video_link(&r.link))
        .take(settings.video_results)
        .collect();

    Ok(AgentOutput::References(ReferenceResult { websites, youtube }))
}

/// Search failures degrade to no results.
fn or_empty(kind: &str, result: Result<Vec<Reference>>) -> Vec<Reference> {
    result.unwrap_or_else(|e| {
        warn!("{kind} search failed: {e}");
        Vec::new()
    })
}
