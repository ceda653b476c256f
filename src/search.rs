//! External reference search (web pages and videos).
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::config::SearchConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

#[async_trait]
pub trait ReferenceSearch: Send + Sync {
    async fn web_search(&self, query: &str, max_results: usize) -> Result<Vec<Reference>>;

    /// Results restricted to video pages.
    async fn video_search(&self, query: &str, max_results: usize) -> Result<Vec<Reference>>;

    fn name(&self) -> &str;
}

const PROVIDER: &str = "duckduckgo";
const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

static RESULT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.result").expect("valid selector"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.result__a").expect("valid selector"));
static SNIPPET_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".result__snippet").expect("valid selector"));

/// DuckDuckGo's HTML endpoint, which needs no API key.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
}

impl DuckDuckGoSearch {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) studymate")
            .build()
            .map_err(|e| Error::provider(PROVIDER, format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn from_config(config: &SearchConfig) -> Result<Self> {
        Self::new(Duration::from_secs(config.timeout_secs))
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Reference>> {
        let response = self
            .client
            .post(SEARCH_URL)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::provider(
                PROVIDER,
                format!("search failed ({})", response.status()),
            ));
        }

        let html = response
            .text()
            .await
            .map_err(|e| Error::provider(PROVIDER, format!("failed to read response: {e}")))?;
        Ok(parse_results(&html))
    }
}

#[async_trait]
impl ReferenceSearch for DuckDuckGoSearch {
    async fn web_search(&self, query: &str, max_results: usize) -> Result<Vec<Reference>> {
        let mut results = self.fetch(query).await?;
        results.truncate(max_results);
        Ok(results)
    }

    async fn video_search(&self, query: &str, max_results: usize) -> Result<Vec<Reference>> {
        let results = self.fetch(&format!("site:youtube.com {query}")).await?;
        Ok(results
            .into_iter()
            .filter(|r| is_video_link(&r.link))
            .take(max_results)
            .collect())
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

/// Parse a DuckDuckGo HTML result page. Ads and results without a link are
/// skipped.
pub fn parse_results(html: &str) -> Vec<Reference> {
    let document = Html::parse_document(html);
    let mut results = Vec::new();

    for result in document.select(&RESULT_SELECTOR) {
        let classes = result.value().attr("class").unwrap_or_default();
        if classes.contains("result--ad") {
            continue;
        }
        let Some(anchor) = result.select(&TITLE_SELECTOR).next() else {
            continue;
        };
        let Some(link) = anchor.value().attr("href").and_then(decode_link) else {
            continue;
        };

        results.push(Reference {
            title: collapse_whitespace(&anchor.text().collect::<String>()),
            link,
            snippet: result
                .select(&SNIPPET_SELECTOR)
                .next()
                .map(|s| collapse_whitespace(&s.text().collect::<String>()))
                .unwrap_or_default(),
        });
    }
    results
}

/// Resolve DuckDuckGo's `/l/?uddg=<target>` redirect links to the target.
fn decode_link(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    let url = Url::parse(&absolute).ok()?;

    if url.path().starts_with("/l/") {
        return url
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

/// Links that point at a playable video page.
pub fn is_video_link(link: &str) -> bool {
    link.contains("youtube.com/watch") || link.contains("youtu.be")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <div class="result results_links result--ad">
            <a class="result__a" href="https://ads.example.com">Sponsored</a>
          </div>
          <div class="result results_links">
            <h2><a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fen.wikipedia.org%2Fwiki%2FGravity&amp;rut=abc">
              Gravity - Wikipedia</a></h2>
            <a class="result__snippet">In physics, <b>gravity</b> is a fundamental interaction.</a>
          </div>
          <div class="result results_links">
            <a class="result__a" href="https://www.youtube.com/watch?v=abc123">Gravity explained</a>
            <div class="result__snippet">A short video.</div>
          </div>
          <div class="result">
            <span>no link here</span>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_parse_results() {
        let results = parse_results(PAGE);
        assert_eq!(results.len(), 2);

        assert_eq!(results[0].title, "Gravity - Wikipedia");
        assert_eq!(results[0].link, "https://en.wikipedia.org/wiki/Gravity");
        assert_eq!(
            results[0].snippet,
            "In physics, gravity is a fundamental interaction."
        );

        assert_eq!(results[1].link, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn test_decode_link() {
        assert_eq!(
            decode_link("https://duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa%3Fb%3D1"),
            Some("https://example.com/a?b=1".to_string())
        );
        assert_eq!(
            decode_link("https://example.com/page"),
            Some("https://example.com/page".to_string())
        );
        assert_eq!(decode_link("javascript:void(0)"), None);
        assert_eq!(decode_link("not a url"), None);
    }

    #[test]
    fn test_is_video_link() {
        assert!(is_video_link("https://www.youtube.com/watch?v=abc"));
        assert!(is_video_link("https://youtu.be/abc"));
        assert!(!is_video_link("https://www.youtube.com/channel/xyz"));
        assert!(!is_video_link("https://vimeo.com/123"));
    }
}
