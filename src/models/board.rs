use serde::{Deserialize, Serialize};

/// アジャイルボード（`/rest/agile/1.0/board`）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<BoardLocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BoardLocation {
    #[serde(rename = "projectKey")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// ボード設定（`/board/{id}/configuration`）。フィルターの解決に使う
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BoardConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRef {
    pub id: String,
}

/// `get_boards`が返す表示用の参照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoardRef {
    pub id: i64,
    pub name: String,
    #[serde(rename = "projectKey")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_key: Option<String>,
}

impl From<Board> for BoardRef {
    fn from(board: Board) -> Self {
        let project_key = board.location.and_then(|l| l.project_key);
        Self {
            id: board.id,
            name: board.name,
            project_key,
        }
    }
}
