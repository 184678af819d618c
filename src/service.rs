use crate::batch::{self, process_batch};
use crate::cache::{Clock, ReportCaches, SystemClock};
use crate::client::{Credentials, JiraClient};
use crate::error::Result;
use crate::jql;
use crate::models::{
    ActiveEpic, Board, BoardConfiguration, BoardRef, EpicInfo, Issue, MyTasks, PagedValues,
    Project, ProjectRef, RangedReport, SearchPage, SearchResult, TaskSummary, User, WorklogEntry,
    WorklogHistory, WorklogItem,
};
use crate::pagination::{OFFSET_PAGE_SIZE, collect_offset_pages, collect_search_pages};
use crate::report::{aggregate_epic_summary, aggregate_ranged_report, entry_in_window, range_window};
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// レポート構築でIssueごとのワークログ取得をファンアウトするときの並行数
const REPORT_FANOUT_CONCURRENCY: usize = 10;
/// ボードレポートは対象Issueが多くなりがちなので広めに取る
const BOARD_FANOUT_CONCURRENCY: usize = 25;
/// トークンページング検索の1ページあたりの件数
const SEARCH_PAGE_SIZE: u32 = 100;
/// Issue単体のワークログ取得で要求する最大件数（Jira側の上限）
const WORKLOG_FETCH_LIMIT: u32 = 5000;

/// ワークログレポートの組み立てを担うサービス
///
/// HTTPクライアントと4つのTTLキャッシュを持つ。資格情報は呼び出しごとに
/// 渡され、キャッシュのキーとしてのみ保持される。
pub struct WorklogService {
    client: JiraClient,
    caches: ReportCaches,
}

impl WorklogService {
    pub fn new() -> Result<Self> {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// 時計を差し替えて作成する（テスト用）
    pub fn with_clock(clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            client: JiraClient::new()?,
            caches: ReportCaches::new(clock),
        })
    }

    /// 操作ユーザーを返す。5分間キャッシュされる
    pub async fn get_current_user(&self, credentials: &Credentials) -> Result<User> {
        let key = credentials.cache_key();
        if let Some(user) = self.caches.current_user.get(&key).await {
            return Ok(user);
        }

        let user: User = self.client.get(credentials, "/rest/api/3/myself").await?;
        self.caches.current_user.insert(key, user.clone()).await;
        Ok(user)
    }

    /// 自分に割り当てられたタスクを検索する
    pub async fn search_my_tasks(
        &self,
        credentials: &Credentials,
        search_text: Option<&str>,
        status: Option<&str>,
    ) -> Result<MyTasks> {
        let jql = jql::my_tasks(search_text, status);
        let body = json!({
            "jql": jql,
            "startAt": 0,
            "maxResults": 50,
            "fields": ["summary", "status", "issuetype"]
        });

        let page: SearchResult = self
            .client
            .post(credentials, "/rest/api/3/search", &body)
            .await?;

        let issues = page
            .issues
            .into_iter()
            .map(|issue| TaskSummary {
                key: issue.key,
                summary: issue.fields.summary,
                status: issue.fields.status.map(|s| s.name),
                issue_type: issue.fields.issue_type.map(|t| t.name),
            })
            .collect();

        Ok(MyTasks {
            issues,
            total: page.total,
        })
    }

    /// ワークログを作成する。レスポンスはそのまま返す
    pub async fn create_worklog(
        &self,
        credentials: &Credentials,
        issue_key: &str,
        payload: &Value,
    ) -> Result<Value> {
        let path = format!("/rest/api/3/issue/{}/worklog", issue_key);
        self.client.post_raw(credentials, &path, payload).await
    }

    /// ワークログを更新する
    pub async fn update_worklog(
        &self,
        credentials: &Credentials,
        issue_key: &str,
        worklog_id: &str,
        payload: &Value,
    ) -> Result<Value> {
        let path = format!("/rest/api/3/issue/{}/worklog/{}", issue_key, worklog_id);
        self.client.put_raw(credentials, &path, payload).await
    }

    /// ワークログを削除する。上流が空ボディを返した場合は`{"success": true}`
    pub async fn delete_worklog(
        &self,
        credentials: &Credentials,
        issue_key: &str,
        worklog_id: &str,
    ) -> Result<Value> {
        let path = format!("/rest/api/3/issue/{}/worklog/{}", issue_key, worklog_id);
        let result = self.client.delete_raw(credentials, &path).await?;

        match &result {
            Value::Object(map) if map.is_empty() => Ok(json!({ "success": true })),
            _ => Ok(result),
        }
    }

    /// 期間内に自分が記録したワークログの履歴を新しい順で返す
    pub async fn get_worklog_history(
        &self,
        credentials: &Credentials,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<WorklogHistory> {
        let me = self.get_current_user(credentials).await?;
        let issues = self
            .search_all(
                credentials,
                &jql::my_worklogs_in_range(start_date, end_date),
                &["summary"],
            )
            .await?;

        let total_issues = issues.len();
        let keyed: Vec<(String, String)> = issues
            .into_iter()
            .map(|i| (i.key, i.fields.summary))
            .collect();

        let fetched = process_batch(keyed, REPORT_FANOUT_CONCURRENCY, |(key, summary)| async move {
            let entries = self.fetch_issue_worklogs_or_empty(credentials, &key).await;
            Ok((key, summary, entries))
        })
        .await?;

        let (window_start, window_end) = range_window(start_date, end_date);
        let mut worklogs: Vec<WorklogItem> = Vec::new();
        for (issue_key, issue_summary, entries) in fetched {
            for entry in entries {
                let is_mine = entry
                    .author
                    .as_ref()
                    .and_then(|a| a.account_id.as_deref())
                    .is_some_and(|id| id == me.account_id);
                if !is_mine || !entry_in_window(&entry, window_start, window_end) {
                    continue;
                }

                let Some(started) = entry.started else {
                    continue;
                };
                worklogs.push(WorklogItem {
                    issue_key: issue_key.clone(),
                    issue_summary: issue_summary.clone(),
                    worklog_id: entry.id,
                    time_spent_seconds: entry.time_spent_seconds,
                    started,
                    comment: entry.comment,
                });
            }
        }
        worklogs.sort_by(|a, b| b.started.cmp(&a.started));

        Ok(WorklogHistory {
            worklogs,
            total_issues,
        })
    }

    /// 単一エピックのワークログ集計を返す
    pub async fn get_epic_worklog_report(
        &self,
        credentials: &Credentials,
        epic_key: &str,
    ) -> Result<crate::models::EpicWorklogReport> {
        let epic: Issue = self
            .client
            .get(
                credentials,
                &format!("/rest/api/3/issue/{}?fields=summary", epic_key),
            )
            .await?;

        let children = self
            .search_all_with_worklogs(credentials, &jql::children_of_epics(&[epic_key.to_string()]))
            .await?;

        let worklogs_by_issue = self
            .resolve_issue_worklogs(credentials, &children, batch::DEFAULT_CONCURRENCY)
            .await?;

        Ok(aggregate_epic_summary(
            &epic.key,
            &epic.fields.summary,
            &worklogs_by_issue,
        ))
    }

    /// 期間内にワークログを持つエピックを、Issue数の多い順で返す
    pub async fn get_active_epics(
        &self,
        credentials: &Credentials,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ActiveEpic>> {
        let issues = self
            .search_all(
                credentials,
                &jql::my_worklogs_in_range(start_date, end_date),
                &["summary", "parent"],
            )
            .await?;

        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, (String, usize)> = HashMap::new();
        for issue in &issues {
            let Some((epic_key, epic_summary)) = issue.parent_ref() else {
                continue;
            };
            let slot = counts.entry(epic_key.clone()).or_insert_with(|| {
                order.push(epic_key);
                (epic_summary, 0)
            });
            slot.1 += 1;
        }

        let mut epics: Vec<ActiveEpic> = order
            .into_iter()
            .map(|epic_key| {
                let (epic_summary, issue_count) = counts.remove(&epic_key).unwrap_or_default();
                ActiveEpic {
                    epic_key,
                    epic_summary,
                    issue_count,
                }
            })
            .collect();
        epics.sort_by(|a, b| b.issue_count.cmp(&a.issue_count));
        Ok(epics)
    }

    /// 自分の期間レポート
    ///
    /// 期間内に自分が時間を記録したIssueの親をエピック候補として拾い、
    /// その子Issue全体のワークログを集計する。
    pub async fn get_monthly_report(
        &self,
        credentials: &Credentials,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RangedReport> {
        let me = self.get_current_user(credentials).await?;
        let cache_key =
            ReportCaches::report_key(credentials, "user", &me.account_id, start_date, end_date);
        if let Some(report) = self.caches.reports.get(&cache_key).await {
            return Ok(report);
        }

        let touched = self
            .search_all(
                credentials,
                &jql::my_worklogs_in_range(start_date, end_date),
                &["summary", "parent"],
            )
            .await?;

        let epics = dedup_parent_epics(&touched);
        let report = self
            .build_epic_range_report(credentials, start_date, end_date, epics)
            .await?;

        self.caches.reports.insert(cache_key, report.clone()).await;
        Ok(report)
    }

    /// プロジェクトの期間レポート
    ///
    /// プロジェクト内の全エピックが対象で、記録者は絞らない。
    pub async fn get_monthly_report_by_project(
        &self,
        credentials: &Credentials,
        project_key: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RangedReport> {
        let cache_key =
            ReportCaches::report_key(credentials, "project", project_key, start_date, end_date);
        if let Some(report) = self.caches.reports.get(&cache_key).await {
            return Ok(report);
        }

        let epic_issues = self
            .search_all(credentials, &jql::project_epics(project_key), &["summary"])
            .await?;
        let epics: Vec<EpicInfo> = epic_issues
            .into_iter()
            .map(|issue| EpicInfo {
                epic_key: issue.key,
                epic_summary: issue.fields.summary,
            })
            .collect();

        let report = self
            .build_epic_range_report(credentials, start_date, end_date, epics)
            .await?;

        self.caches.reports.insert(cache_key, report.clone()).await;
        Ok(report)
    }

    /// ボードの期間レポート
    ///
    /// ボードのフィルター（無ければプロジェクト）で対象Issueを検索し、
    /// 親エピックごとにまとめて集計する。ボード設定の解決に失敗しても
    /// ハードエラーにはせず、縮退して空のレポートまで許容する。
    pub async fn get_monthly_report_by_board(
        &self,
        credentials: &Credentials,
        board_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RangedReport> {
        let cache_key = ReportCaches::report_key(
            credentials,
            "board",
            &board_id.to_string(),
            start_date,
            end_date,
        );
        if let Some(report) = self.caches.reports.get(&cache_key).await {
            return Ok(report);
        }

        let report = match self
            .resolve_board_jql(credentials, board_id, start_date, end_date)
            .await
        {
            Some(board_jql) => {
                let issues = self
                    .search_all_with_worklogs(credentials, &board_jql)
                    .await?;

                let worklogs_by_issue = self
                    .resolve_issue_worklogs(credentials, &issues, BOARD_FANOUT_CONCURRENCY)
                    .await?;
                let entry_map: HashMap<String, Vec<WorklogEntry>> =
                    worklogs_by_issue.into_iter().collect();

                let epics = dedup_parent_epics(&issues);
                let mut issues_by_epic: HashMap<String, Vec<Issue>> = HashMap::new();
                for issue in issues {
                    if let Some((epic_key, _)) = issue.parent_ref() {
                        issues_by_epic.entry(epic_key).or_default().push(issue);
                    }
                }

                aggregate_ranged_report(
                    start_date,
                    end_date,
                    &epics,
                    &issues_by_epic,
                    &entry_map,
                )
            }
            None => RangedReport {
                start_date,
                end_date,
                total_time_seconds: 0,
                epics: Vec::new(),
            },
        };

        self.caches.reports.insert(cache_key, report.clone()).await;
        Ok(report)
    }

    /// 参加しているプロジェクトの一覧をキー順で返す。5分間キャッシュされる
    pub async fn get_my_projects(&self, credentials: &Credentials) -> Result<Vec<ProjectRef>> {
        let key = credentials.cache_key();
        if let Some(projects) = self.caches.projects.get(&key).await {
            return Ok(projects);
        }

        let values: Vec<Project> = collect_offset_pages(|offset| async move {
            let path = format!(
                "/rest/api/3/project/search?startAt={}&maxResults={}",
                offset, OFFSET_PAGE_SIZE
            );
            let page: PagedValues<Project> = self.client.get(credentials, &path).await?;
            Ok(page)
        })
        .await?;

        let mut projects: Vec<ProjectRef> = values.into_iter().map(ProjectRef::from).collect();
        projects.sort_by(|a, b| a.key.cmp(&b.key));

        self.caches.projects.insert(key, projects.clone()).await;
        Ok(projects)
    }

    /// アクセス可能なボードの一覧を名前順で返す。5分間キャッシュされる
    pub async fn get_boards(&self, credentials: &Credentials) -> Result<Vec<BoardRef>> {
        let key = credentials.cache_key();
        if let Some(boards) = self.caches.boards.get(&key).await {
            return Ok(boards);
        }

        let values: Vec<Board> = collect_offset_pages(|offset| async move {
            let path = format!(
                "/rest/agile/1.0/board?startAt={}&maxResults={}",
                offset, OFFSET_PAGE_SIZE
            );
            let page: PagedValues<Board> = self.client.get(credentials, &path).await?;
            Ok(page)
        })
        .await?;

        let mut boards: Vec<BoardRef> = values.into_iter().map(BoardRef::from).collect();
        boards.sort_by(|a, b| a.name.cmp(&b.name));

        self.caches.boards.insert(key, boards.clone()).await;
        Ok(boards)
    }

    /// エピック集合から期間レポートを組み立てる共通経路
    ///
    /// 子Issueは1回の`parent in (...)`検索でまとめて取り、Issueごとの
    /// ワークログをファンアウトで取得する。個別Issueの取得失敗は
    /// 空のワークログとして扱い、レポート全体は失敗させない。
    async fn build_epic_range_report(
        &self,
        credentials: &Credentials,
        start_date: NaiveDate,
        end_date: NaiveDate,
        epics: Vec<EpicInfo>,
    ) -> Result<RangedReport> {
        if epics.is_empty() {
            return Ok(RangedReport {
                start_date,
                end_date,
                total_time_seconds: 0,
                epics: Vec::new(),
            });
        }

        let epic_keys: Vec<String> = epics.iter().map(|e| e.epic_key.clone()).collect();
        let children = self
            .search_all(
                credentials,
                &jql::children_of_epics(&epic_keys),
                &["summary", "parent"],
            )
            .await?;

        let child_keys: Vec<String> = children.iter().map(|i| i.key.clone()).collect();
        let fetched = process_batch(child_keys, REPORT_FANOUT_CONCURRENCY, |key| async move {
            let entries = self.fetch_issue_worklogs_or_empty(credentials, &key).await;
            Ok((key, entries))
        })
        .await?;
        let worklogs_by_issue: HashMap<String, Vec<WorklogEntry>> = fetched.into_iter().collect();

        let mut issues_by_epic: HashMap<String, Vec<Issue>> = HashMap::new();
        for child in children {
            if let Some((epic_key, _)) = child.parent_ref() {
                issues_by_epic.entry(epic_key).or_default().push(child);
            }
        }

        Ok(aggregate_ranged_report(
            start_date,
            end_date,
            &epics,
            &issues_by_epic,
            &worklogs_by_issue,
        ))
    }

    /// ボードレポートに使うJQLを解決する
    ///
    /// 設定のフィルターが第一候補。設定が取れない・フィルターが無い場合は
    /// ボードのプロジェクトへ縮退し、それも無ければ`None`。
    async fn resolve_board_jql(
        &self,
        credentials: &Credentials,
        board_id: i64,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Option<String> {
        let config_path = format!("/rest/agile/1.0/board/{}/configuration", board_id);
        let filter_id = match self
            .client
            .get::<BoardConfiguration>(credentials, &config_path)
            .await
        {
            Ok(config) => config.filter.map(|f| f.id),
            Err(err) => {
                warn!(board_id, error = %err, "board configuration lookup failed, falling back to project");
                None
            }
        };

        if let Some(filter_id) = filter_id {
            return Some(jql::board_filter_scope(&filter_id, start_date, end_date));
        }

        let board_path = format!("/rest/agile/1.0/board/{}", board_id);
        let project_key = match self.client.get::<Board>(credentials, &board_path).await {
            Ok(board) => board.location.and_then(|l| l.project_key),
            Err(err) => {
                warn!(board_id, error = %err, "board lookup failed");
                None
            }
        };

        match project_key {
            Some(project_key) => Some(jql::board_project_scope(&project_key, start_date, end_date)),
            None => {
                warn!(board_id, "board has neither filter nor project, returning empty report");
                None
            }
        }
    }

    /// 各Issueのワークログ全件を、埋め込みページまたは個別取得で揃える
    ///
    /// 埋め込みページが全件を含むIssueはそのまま使い、溢れているIssueだけ
    /// 個別エンドポイントから取り直す。個別取得の失敗は空リスト扱い。
    async fn resolve_issue_worklogs(
        &self,
        credentials: &Credentials,
        issues: &[Issue],
        concurrency: usize,
    ) -> Result<Vec<(String, Vec<WorklogEntry>)>> {
        let mut worklogs_by_issue: Vec<(String, Vec<WorklogEntry>)> = Vec::new();
        let mut heavy_keys: Vec<String> = Vec::new();

        for issue in issues {
            match &issue.fields.worklog {
                Some(page) if page.is_complete() => {
                    worklogs_by_issue.push((issue.key.clone(), page.worklogs.clone()));
                }
                _ => {
                    heavy_keys.push(issue.key.clone());
                    worklogs_by_issue.push((issue.key.clone(), Vec::new()));
                }
            }
        }

        if heavy_keys.is_empty() {
            return Ok(worklogs_by_issue);
        }

        let fetched = process_batch(heavy_keys, concurrency, |key| async move {
            let entries = self.fetch_issue_worklogs_or_empty(credentials, &key).await;
            Ok((key, entries))
        })
        .await?;
        let mut fetched_map: HashMap<String, Vec<WorklogEntry>> = fetched.into_iter().collect();

        for (key, entries) in &mut worklogs_by_issue {
            if let Some(full) = fetched_map.remove(key) {
                *entries = full;
            }
        }

        Ok(worklogs_by_issue)
    }

    async fn fetch_issue_worklogs(
        &self,
        credentials: &Credentials,
        issue_key: &str,
    ) -> Result<Vec<WorklogEntry>> {
        let path = format!(
            "/rest/api/3/issue/{}/worklog?startAt=0&maxResults={}",
            issue_key, WORKLOG_FETCH_LIMIT
        );
        let page: crate::models::WorklogPage = self.client.get(credentials, &path).await?;
        Ok(page.worklogs)
    }

    /// ファンアウト用の回復付き取得。失敗はワークログ0件として扱う
    async fn fetch_issue_worklogs_or_empty(
        &self,
        credentials: &Credentials,
        issue_key: &str,
    ) -> Vec<WorklogEntry> {
        match self.fetch_issue_worklogs(credentials, issue_key).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(issue_key, error = %err, "worklog fetch failed, contributing empty list");
                Vec::new()
            }
        }
    }

    /// トークンページングで検索結果を全件集める
    async fn search_all(
        &self,
        credentials: &Credentials,
        jql: &str,
        fields: &[&str],
    ) -> Result<Vec<Issue>> {
        let fields_value = json!(fields);
        collect_search_pages(|token| {
            let fields_value = fields_value.clone();
            async move {
                let mut body = json!({
                    "jql": jql,
                    "maxResults": SEARCH_PAGE_SIZE,
                    "fields": fields_value
                });
                if let Some(token) = token {
                    body["nextPageToken"] = json!(token);
                }
                let page: SearchPage = self
                    .client
                    .post(credentials, "/rest/api/3/search/jql", &body)
                    .await?;
                Ok(page)
            }
        })
        .await
    }

    /// ワークログページを埋め込んだ検索。レポート経路で使う
    async fn search_all_with_worklogs(
        &self,
        credentials: &Credentials,
        jql: &str,
    ) -> Result<Vec<Issue>> {
        self.search_all(credentials, jql, &["summary", "parent", "worklog"])
            .await
    }
}

/// Issue列の親エピックを出現順で重複排除する
fn dedup_parent_epics(issues: &[Issue]) -> Vec<EpicInfo> {
    let mut seen: Vec<EpicInfo> = Vec::new();
    for issue in issues {
        let Some((epic_key, epic_summary)) = issue.parent_ref() else {
            continue;
        };
        if !seen.iter().any(|e| e.epic_key == epic_key) {
            seen.push(EpicInfo {
                epic_key,
                epic_summary,
            });
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue_with_parent(key: &str, parent: Option<(&str, &str)>) -> Issue {
        let mut fields = json!({ "summary": key });
        if let Some((parent_key, parent_summary)) = parent {
            fields["parent"] = json!({
                "key": parent_key,
                "fields": { "summary": parent_summary }
            });
        }
        serde_json::from_value(json!({ "key": key, "fields": fields })).unwrap()
    }

    #[test]
    fn test_dedup_parent_epics_preserves_first_occurrence_order() {
        let issues = vec![
            issue_with_parent("TASK-1", Some(("EPIC-2", "Second"))),
            issue_with_parent("TASK-2", Some(("EPIC-1", "First"))),
            issue_with_parent("TASK-3", Some(("EPIC-2", "Second"))),
            issue_with_parent("TASK-4", None),
        ];

        let epics = dedup_parent_epics(&issues);

        assert_eq!(epics.len(), 2);
        assert_eq!(epics[0].epic_key, "EPIC-2");
        assert_eq!(epics[1].epic_key, "EPIC-1");
    }

    #[test]
    fn test_dedup_parent_epics_empty_input() {
        let epics = dedup_parent_epics(&[]);

        assert!(epics.is_empty());
    }
}
