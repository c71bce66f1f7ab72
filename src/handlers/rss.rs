use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::ProxyError;
use crate::services::news::{NewsItem, MAX_RESULTS, MAX_WINDOW_HOURS};
use crate::startup::AppState;

const DEFAULT_LANGS: &str = "en,he,ar,fa";
const DEFAULT_WINDOW_HOURS: i64 = 2;

#[derive(Deserialize, Debug)]
pub struct NewsQuery {
    pub q: Option<String>,
    pub langs: Option<String>,
    /// Time window in hours, capped at 24; non-numeric or non-positive
    /// values fall back to the default.
    pub hours: Option<String>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewsSearchResponse {
    pub results: Vec<NewsItem>,
    pub total: usize,
    pub queried_at: String,
    pub languages: Vec<String>,
    pub keyword: String,
}

/// Aggregated multi-language news search. `q` is required; `langs` is a
/// comma-separated language list; `hours` bounds the recency window.
pub async fn search_news(
    State(state): State<AppState>,
    Query(query): Query<NewsQuery>,
) -> Result<Json<NewsSearchResponse>, ProxyError> {
    let keyword = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ProxyError::BadRequest("Missing query parameter: q".to_string()))?
        .to_string();

    let languages: Vec<String> = query
        .langs
        .as_deref()
        .unwrap_or(DEFAULT_LANGS)
        .split(',')
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    let max_hours = query
        .hours
        .as_deref()
        .and_then(|h| h.parse::<i64>().ok())
        .filter(|h| *h > 0)
        .unwrap_or(DEFAULT_WINDOW_HOURS)
        .min(MAX_WINDOW_HOURS);

    let items = state.news.search(&keyword, &languages, max_hours).await;
    let total = items.len();
    let results: Vec<NewsItem> = items.into_iter().take(MAX_RESULTS).collect();

    Ok(Json(NewsSearchResponse {
        results,
        total,
        queried_at: Utc::now().to_rfc3339(),
        languages,
        keyword,
    }))
}
