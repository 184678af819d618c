use chrono::NaiveDate;

/// ユーザー入力をJQL文字列リテラルに埋め込める形にする
///
/// エスケープ対象は二重引用符のみ。これが唯一の注入対策となる。
pub fn escape_quotes(text: &str) -> String {
    text.replace('"', "\\\"")
}

/// 自分のタスク検索
///
/// ステータスが未指定またはリテラル`all`の場合、status句は付かない。
pub fn my_tasks(search_text: Option<&str>, status: Option<&str>) -> String {
    let mut jql = String::from("assignee = currentUser()");

    if let Some(status) = status {
        if status != "all" {
            jql.push_str(&format!(" AND status = \"{}\"", escape_quotes(status)));
        }
    }

    if let Some(text) = search_text {
        if !text.trim().is_empty() {
            let escaped = escape_quotes(text);
            jql.push_str(&format!(
                " AND (summary ~ \"{}\" OR key ~ \"{}\")",
                escaped, escaped
            ));
        }
    }

    jql.push_str(" ORDER BY updated DESC");
    jql
}

/// 期間内に自分が時間を記録したIssueの検索。日付リテラルは常に引用する
pub fn my_worklogs_in_range(start_date: NaiveDate, end_date: NaiveDate) -> String {
    format!(
        "worklogAuthor = currentUser() AND worklogDate >= \"{}\" AND worklogDate <= \"{}\" ORDER BY updated DESC",
        start_date, end_date
    )
}

/// 指定エピック群の子Issue検索
pub fn children_of_epics(epic_keys: &[String]) -> String {
    let keys = epic_keys
        .iter()
        .map(|k| format!("\"{}\"", escape_quotes(k)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("parent in ({}) ORDER BY parent ASC", keys)
}

/// プロジェクト内の全エピック検索
pub fn project_epics(project_key: &str) -> String {
    format!(
        "project = \"{}\" AND issuetype = Epic ORDER BY created DESC",
        escape_quotes(project_key)
    )
}

/// ボードのフィルターを使った期間内検索
pub fn board_filter_scope(filter_id: &str, start_date: NaiveDate, end_date: NaiveDate) -> String {
    format!(
        "filter = {} AND worklogDate >= \"{}\" AND worklogDate <= \"{}\" ORDER BY updated DESC",
        filter_id, start_date, end_date
    )
}

/// フィルターを持たないボード向けの、プロジェクトによる代替検索
pub fn board_project_scope(
    project_key: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> String {
    format!(
        "project = \"{}\" AND worklogDate >= \"{}\" AND worklogDate <= \"{}\" ORDER BY updated DESC",
        escape_quotes(project_key),
        start_date,
        end_date
    )
}
