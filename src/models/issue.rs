use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Project, WorklogPage};

/// 検索結果として返るIssue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    pub fields: IssueFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(rename = "issuetype")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    /// 親Issue（エピック）への参照
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<Parent>,
    /// 検索時に埋め込まれたワークログのページ
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worklog: Option<WorklogPage>,

    // カスタムフィールドは動的に追加
    #[serde(flatten)]
    pub custom_fields: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueType {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parent {
    pub key: String,
    #[serde(default)]
    pub fields: ParentFields,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParentFields {
    #[serde(default)]
    pub summary: String,
}

impl Issue {
    /// 親エピックの(key, summary)を返す
    pub fn parent_ref(&self) -> Option<(String, String)> {
        self.fields
            .parent
            .as_ref()
            .map(|p| (p.key.clone(), p.fields.summary.clone()))
    }
}
