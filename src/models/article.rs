use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One search hit, tagged with the category it was fetched for.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Article {
    pub title: String,
    pub link: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub snippet: Option<String>,
    pub category: String,
    /// Time the article was fetched
    #[serde(rename = "publishedAt")]
    #[schema(value_type = String, format = DateTime)]
    pub published_at: DateTime<Utc>,
}
