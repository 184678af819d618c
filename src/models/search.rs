use super::Issue;
use serde::{Deserialize, Serialize};

/// トークンページングの検索レスポンス（POST `/rest/api/3/search/jql`）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// 次ページがある場合のみ返るトークン
    #[serde(rename = "nextPageToken")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(rename = "isLast")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_last: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
}

/// クラシック検索のレスポンス（POST `/rest/api/3/search`）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "startAt")]
    #[serde(default)]
    pub start_at: u32,
    #[serde(rename = "maxResults")]
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// オフセットページングの一覧レスポンス（v3一覧系・agileボード一覧）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct PagedValues<T> {
    #[serde(rename = "startAt")]
    #[serde(default)]
    pub start_at: u32,
    #[serde(rename = "maxResults")]
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(rename = "isLast")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_last: Option<bool>,
    #[serde(default)]
    pub values: Vec<T>,
}
