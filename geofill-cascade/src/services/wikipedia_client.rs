//! Wikipedia knowledge-base client
//!
//! Uses the MediaWiki action API of a language edition:
//! - `list=search` for candidate article titles
//! - `prop=coordinates|extracts` (redirects followed) for the article's
//!   primary coordinate and intro text

use async_trait::async_trait;
use geofill_common::Coordinate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::types::{EvidenceError, KnowledgeBase, KnowledgePage};

/// Placeholder `{lang}` is replaced by the language edition
const WIKIPEDIA_API_TEMPLATE: &str = "https://{lang}.wikipedia.org/w/api.php";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    query: Option<PageQuery>,
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    #[serde(default)]
    pages: Vec<WikiPage>,
}

#[derive(Debug, Deserialize)]
struct WikiPage {
    #[serde(default)]
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    coordinates: Vec<WikiCoordinate>,
}

#[derive(Debug, Deserialize)]
struct WikiCoordinate {
    lat: f64,
    lon: f64,
}

pub struct WikipediaClient {
    http_client: Client,
    api_template: String,
}

impl WikipediaClient {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, EvidenceError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| EvidenceError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_template: WIKIPEDIA_API_TEMPLATE.to_string(),
        })
    }

    /// Override the API URL template (must contain `{lang}`)
    pub fn with_api_template(mut self, template: impl Into<String>) -> Self {
        self.api_template = template.into();
        self
    }

    fn api_url(&self, lang: &str) -> Result<String, EvidenceError> {
        if lang.is_empty() || !lang.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(EvidenceError::Internal(format!("invalid language edition: {:?}", lang)));
        }
        Ok(self.api_template.replace("{lang}", lang))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        lang: &str,
        params: &[(&str, &str)],
    ) -> Result<T, EvidenceError> {
        let url = self.api_url(lang)?;
        let response = self
            .http_client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| EvidenceError::from_request("Wikipedia request failed", e))?;

        if !response.status().is_success() {
            return Err(EvidenceError::Api(format!(
                "Wikipedia ({}) returned {}",
                lang,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| EvidenceError::from_request("Wikipedia response read failed", e))?;
        serde_json::from_str(&body)
            .map_err(|e| EvidenceError::Parse(format!("Failed to parse Wikipedia response: {}", e)))
    }
}

fn search_titles(response: SearchResponse, limit: usize) -> Vec<String> {
    response
        .query
        .map(|q| q.search.into_iter().map(|h| h.title).take(limit).collect())
        .unwrap_or_default()
}

fn first_page(response: PageResponse) -> Option<KnowledgePage> {
    let page = response.query?.pages.into_iter().next()?;
    if page.missing {
        return None;
    }
    let coordinate = page
        .coordinates
        .first()
        .map(|c| Coordinate::new(c.lat, c.lon));
    Some(KnowledgePage {
        title: page.title,
        summary: page.extract.unwrap_or_default(),
        coordinate,
    })
}

#[async_trait]
impl KnowledgeBase for WikipediaClient {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn search(&self, query: &str, lang: &str, limit: usize) -> Result<Vec<String>, EvidenceError> {
        debug!(query = %query, lang = %lang, "Wikipedia search");
        let limit_text = limit.to_string();
        let response: SearchResponse = self
            .get_json(
                lang,
                &[
                    ("action", "query"),
                    ("list", "search"),
                    ("srsearch", query),
                    ("srlimit", &limit_text),
                    ("format", "json"),
                    ("formatversion", "2"),
                ],
            )
            .await?;
        Ok(search_titles(response, limit))
    }

    async fn page(&self, title: &str, lang: &str) -> Result<Option<KnowledgePage>, EvidenceError> {
        let response: PageResponse = self
            .get_json(
                lang,
                &[
                    ("action", "query"),
                    ("prop", "coordinates|extracts"),
                    ("titles", title),
                    ("redirects", "1"),
                    ("exintro", "1"),
                    ("explaintext", "1"),
                    ("format", "json"),
                    ("formatversion", "2"),
                ],
            )
            .await?;
        Ok(first_page(response))
    }
}
