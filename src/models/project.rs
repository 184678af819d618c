use serde::{Deserialize, Serialize};

/// プロジェクト（一覧エンドポイントおよびIssueフィールド内の参照）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    pub name: String,
}

/// `get_my_projects`が返す表示用の参照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectRef {
    pub key: String,
    pub name: String,
}

impl From<Project> for ProjectRef {
    fn from(project: Project) -> Self {
        Self {
            key: project.key,
            name: project.name,
        }
    }
}
