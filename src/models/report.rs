use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 重複排除済みのエピック参照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct EpicInfo {
    #[serde(rename = "epicKey")]
    pub epic_key: String,
    #[serde(rename = "epicSummary")]
    pub epic_summary: String,
}

/// ユーザーごとの内訳に並ぶ1 Issue分の時間
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueTime {
    #[serde(rename = "issueKey")]
    pub issue_key: String,
    #[serde(rename = "issueSummary")]
    pub issue_summary: String,
    #[serde(rename = "timeSpentSeconds")]
    pub time_spent_seconds: i64,
}

/// エピック内の1ユーザー分の集計
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEpicWorklog {
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "totalTimeSeconds")]
    pub total_time_seconds: i64,
    /// 時間の多い順
    pub issues: Vec<IssueTime>,
}

/// 期間レポート内の1エピック分の集計。合計0のエピックは含まれない
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicReport {
    #[serde(rename = "epicKey")]
    pub epic_key: String,
    #[serde(rename = "epicSummary")]
    pub epic_summary: String,
    #[serde(rename = "totalTimeSeconds")]
    pub total_time_seconds: i64,
    /// 時間の多い順
    pub users: Vec<UserEpicWorklog>,
}

/// 日付範囲に対するレポート（終了日は含む）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangedReport {
    #[serde(rename = "startDate")]
    pub start_date: NaiveDate,
    #[serde(rename = "endDate")]
    pub end_date: NaiveDate,
    #[serde(rename = "totalTimeSeconds")]
    pub total_time_seconds: i64,
    /// 時間の多い順
    pub epics: Vec<EpicReport>,
}

/// 単一エピックのフラットなワークログ集計
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicWorklogReport {
    #[serde(rename = "epicKey")]
    pub epic_key: String,
    #[serde(rename = "epicSummary")]
    pub epic_summary: String,
    #[serde(rename = "totalIssues")]
    pub total_issues: usize,
    #[serde(rename = "totalTimeSeconds")]
    pub total_time_seconds: i64,
    pub users: Vec<EpicUserSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpicUserSummary {
    #[serde(rename = "accountId")]
    pub account_id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "totalTimeSeconds")]
    pub total_time_seconds: i64,
    /// 触れたIssueキー（重複排除・昇順）
    #[serde(rename = "issueKeys")]
    pub issue_keys: Vec<String>,
}

/// 期間内にワークログを持つエピック
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveEpic {
    #[serde(rename = "epicKey")]
    pub epic_key: String,
    #[serde(rename = "epicSummary")]
    pub epic_summary: String,
    #[serde(rename = "issueCount")]
    pub issue_count: usize,
}

/// ワークログ履歴の1行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorklogItem {
    #[serde(rename = "issueKey")]
    pub issue_key: String,
    #[serde(rename = "issueSummary")]
    pub issue_summary: String,
    #[serde(rename = "worklogId")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worklog_id: Option<String>,
    #[serde(rename = "timeSpentSeconds")]
    pub time_spent_seconds: i64,
    pub started: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<serde_json::Value>,
}

/// `get_worklog_history`の結果。新しい順
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorklogHistory {
    pub worklogs: Vec<WorklogItem>,
    #[serde(rename = "totalIssues")]
    pub total_issues: usize,
}

/// タスク一覧の1行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub key: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "issueType")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
}

/// `search_my_tasks`の結果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyTasks {
    pub issues: Vec<TaskSummary>,
    pub total: u32,
}
