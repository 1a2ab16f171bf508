use crate::{models::Article, utils::AppError};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub organic: Vec<OrganicResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrganicResult {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: Option<String>,
}

/// Web search backend the article feed is built from.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, num: u32) -> Result<Vec<OrganicResult>, AppError>;
}

/// Client for the Serper Google search API.
pub struct SerperClient {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl SerperClient {
    pub fn new(api_url: &str, api_key: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl SearchProvider for SerperClient {
    async fn search(&self, query: &str, num: u32) -> Result<Vec<OrganicResult>, AppError> {
        log::debug!("🔎 Searching Serper for '{}'", query);

        let response = self
            .http
            .post(&self.api_url)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest { q: query, num })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::ExternalService(format!(
                "Serper API error: {}",
                response.status()
            )));
        }

        let body: SearchResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse Serper response: {}", e))
        })?;

        Ok(body.organic)
    }
}

/// Searches every category in order and concatenates the hits.
/// A category that fails is logged and skipped; it never fails the whole feed.
pub async fn aggregate_articles(
    provider: &dyn SearchProvider,
    categories: &[String],
    per_category: u32,
) -> Vec<Article> {
    let mut articles = Vec::new();

    for category in categories {
        match provider.search(category, per_category).await {
            Ok(results) => {
                let fetched_at = Utc::now();
                articles.extend(results.into_iter().map(|item| Article {
                    title: item.title,
                    link: item.link,
                    snippet: item.snippet,
                    category: category.clone(),
                    published_at: fetched_at,
                }));
            }
            Err(e) => {
                log::error!("❌ Error fetching articles for {}: {}", category, e);
            }
        }
    }

    articles
}
