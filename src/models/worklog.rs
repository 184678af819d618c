use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// ワークログの作成者
///
/// Jira側の削除済みユーザーなどではフィールドが欠けることがあるため全て任意。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorklogAuthor {
    #[serde(rename = "accountId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(rename = "displayName")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "emailAddress")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
}

/// Issueに紐づく1件の時間記録
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorklogEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<WorklogAuthor>,
    #[serde(rename = "timeSpentSeconds")]
    #[serde(default)]
    pub time_spent_seconds: i64,
    /// 記録の開始時刻。欠落・解析不能な値は`None`になり集計から除外される
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_jira_datetime_opt")]
    pub started: Option<DateTime<Utc>>,
    /// リッチテキスト（ADF）のコメント断片
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<serde_json::Value>,
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_jira_datetime_opt")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    #[serde(deserialize_with = "deserialize_jira_datetime_opt")]
    pub updated: Option<DateTime<Utc>>,
}

/// Issueに埋め込まれる、または`/worklog`エンドポイントが返すワークログのページ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorklogPage {
    #[serde(rename = "startAt")]
    #[serde(default)]
    pub start_at: u32,
    #[serde(rename = "maxResults")]
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub worklogs: Vec<WorklogEntry>,
}

impl WorklogPage {
    /// 埋め込みページが全件を含んでいるか
    pub fn is_complete(&self) -> bool {
        self.total <= self.max_results
    }
}

/// Jiraのタイムスタンプを解析する
///
/// RFC 3339に加え、Jira Cloudが返す`2024-01-05T09:00:00.000+0000`
/// 形式（コロンなしオフセット）を受け付ける。
pub fn parse_jira_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.3f%z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn deserialize_jira_datetime_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_jira_timestamp))
}
