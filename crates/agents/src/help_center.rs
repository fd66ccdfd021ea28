//! Zendesk help-center article search.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::config::ZendeskConfig;

/// Any HTML tag, matched lazily so adjacent tags are removed separately.
static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<.*?>").expect("valid regex"));

/// A help-center article as returned by the search endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Article {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Article>,
}

/// Errors from the help-center API.
#[derive(Debug, thiserror::Error)]
pub enum HelpCenterError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Help center API error ({status}): {body}")]
    ApiError { status: u16, body: String },
}

/// HTTP client for one Zendesk account.
#[derive(Clone)]
pub struct HelpCenterClient {
    client: reqwest::Client,
    config: ZendeskConfig,
}

impl HelpCenterClient {
    pub fn new(config: ZendeskConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: ZendeskConfig) -> Self {
        Self { client, config }
    }

    /// Search articles matching `query`.
    ///
    /// Results are de-duplicated by name and their bodies stripped of HTML.
    pub async fn search(&self, query: &str) -> Result<Vec<Article>, HelpCenterError> {
        let response = self
            .client
            .get(format!(
                "{}/api/v2/help_center/articles/search.json",
                self.config.base_url
            ))
            .query(&[("query", query)])
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(HelpCenterError::ApiError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SearchResponse = response.json().await?;
        Ok(dedupe_articles(parsed.results)
            .into_iter()
            .map(|article| Article {
                body: strip_html(&article.body),
                ..article
            })
            .collect())
    }
}

/// Remove every HTML tag from `content`.
pub fn strip_html(content: &str) -> String {
    HTML_TAG_RE.replace_all(content, "").into_owned()
}

/// Keep the first article for each distinct name, preserving order.
pub fn dedupe_articles(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|article| seen.insert(article.name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(name: &str, body: &str) -> Article {
        Article {
            name: name.into(),
            body: body.into(),
        }
    }

    #[test]
    fn strip_html_removes_tags() {
        assert_eq!(
            strip_html("<p>Reset your <a href=\"/x\">password</a>.</p>"),
            "Reset your password."
        );
        assert_eq!(strip_html("no tags"), "no tags");
        assert_eq!(strip_html("<div\nclass=\"a\">multi</div>"), "multi");
    }

    #[test]
    fn dedupe_keeps_first_occurrence_in_order() {
        let deduped = dedupe_articles(vec![
            article("Billing", "first"),
            article("Login", "login"),
            article("Billing", "second"),
        ]);
        assert_eq!(
            deduped,
            vec![article("Billing", "first"), article("Login", "login")]
        );
    }
}
