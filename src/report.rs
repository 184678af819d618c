use crate::models::{
    EpicInfo, EpicReport, EpicUserSummary, EpicWorklogReport, Issue, IssueTime, RangedReport,
    UserEpicWorklog, WorklogEntry,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;

/// 作成者表示名が欠けている場合の代替
const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

/// 日付範囲をUTCの時刻境界に広げる
///
/// 終了日を含めるため、上限は翌日0時の排他的境界になる。
pub fn range_window(start_date: NaiveDate, end_date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = NaiveTime::MIN;
    let start = start_date.and_time(midnight).and_utc();
    let end_exclusive = end_date.and_time(midnight).and_utc() + Duration::days(1);
    (start, end_exclusive)
}

/// ワークログが集計対象かどうか
///
/// 開始時刻が無い、または境界の外にある記録は無条件で除外する。
pub fn entry_in_window(
    entry: &WorklogEntry,
    start: DateTime<Utc>,
    end_exclusive: DateTime<Utc>,
) -> bool {
    match entry.started {
        Some(started) => started >= start && started < end_exclusive,
        None => false,
    }
}

struct UserAccumulator {
    display_name: String,
    total_time_seconds: i64,
    // Issueキー -> (サマリー, 合計秒)
    issues: HashMap<String, (String, i64)>,
}

/// (エピック, 子Issue群, Issueごとのワークログ)から期間レポートを組み立てる
///
/// - 作成者のaccountIdが無い記録、開始時刻が範囲外の記録は除外
/// - 同一ユーザーが同一Issueに複数記録した分は合算
/// - 各階層は時間の多い順に並び、合計0のエピックは含まれない
pub fn aggregate_ranged_report(
    start_date: NaiveDate,
    end_date: NaiveDate,
    epics: &[EpicInfo],
    issues_by_epic: &HashMap<String, Vec<Issue>>,
    worklogs_by_issue: &HashMap<String, Vec<WorklogEntry>>,
) -> RangedReport {
    let (start, end_exclusive) = range_window(start_date, end_date);

    let mut epic_reports: Vec<EpicReport> = Vec::new();

    for epic in epics {
        let Some(issues) = issues_by_epic.get(&epic.epic_key) else {
            continue;
        };
        if issues.is_empty() {
            continue;
        }

        let mut users: HashMap<String, UserAccumulator> = HashMap::new();

        for issue in issues {
            let Some(entries) = worklogs_by_issue.get(&issue.key) else {
                continue;
            };

            for entry in entries {
                let Some(account_id) = entry
                    .author
                    .as_ref()
                    .and_then(|a| a.account_id.as_deref())
                else {
                    continue;
                };
                if !entry_in_window(entry, start, end_exclusive) {
                    continue;
                }

                let display_name = entry
                    .author
                    .as_ref()
                    .and_then(|a| a.display_name.clone())
                    .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string());

                let user = users
                    .entry(account_id.to_string())
                    .or_insert_with(|| UserAccumulator {
                        display_name,
                        total_time_seconds: 0,
                        issues: HashMap::new(),
                    });

                user.total_time_seconds += entry.time_spent_seconds;
                let slot = user
                    .issues
                    .entry(issue.key.clone())
                    .or_insert_with(|| (issue.fields.summary.clone(), 0));
                slot.1 += entry.time_spent_seconds;
            }
        }

        let mut user_reports: Vec<UserEpicWorklog> = users
            .into_iter()
            .map(|(account_id, acc)| {
                let mut issues: Vec<IssueTime> = acc
                    .issues
                    .into_iter()
                    .map(|(issue_key, (issue_summary, seconds))| IssueTime {
                        issue_key,
                        issue_summary,
                        time_spent_seconds: seconds,
                    })
                    .collect();
                issues.sort_by(|a, b| b.time_spent_seconds.cmp(&a.time_spent_seconds));

                UserEpicWorklog {
                    account_id,
                    display_name: acc.display_name,
                    total_time_seconds: acc.total_time_seconds,
                    issues,
                }
            })
            .collect();
        user_reports.sort_by(|a, b| b.total_time_seconds.cmp(&a.total_time_seconds));

        let epic_total: i64 = user_reports.iter().map(|u| u.total_time_seconds).sum();
        if epic_total > 0 {
            epic_reports.push(EpicReport {
                epic_key: epic.epic_key.clone(),
                epic_summary: epic.epic_summary.clone(),
                total_time_seconds: epic_total,
                users: user_reports,
            });
        }
    }

    epic_reports.sort_by(|a, b| b.total_time_seconds.cmp(&a.total_time_seconds));
    let total_time_seconds = epic_reports.iter().map(|e| e.total_time_seconds).sum();

    RangedReport {
        start_date,
        end_date,
        total_time_seconds,
        epics: epic_reports,
    }
}

/// 単一エピックのフラットな集計
///
/// Issueごとのワークログ列を受け取り、ユーザー単位の合計と
/// 触れたIssueキーの一覧（重複排除・昇順）にまとめる。
pub fn aggregate_epic_summary(
    epic_key: &str,
    epic_summary: &str,
    worklogs_by_issue: &[(String, Vec<WorklogEntry>)],
) -> EpicWorklogReport {
    struct SummaryAccumulator {
        display_name: String,
        total_time_seconds: i64,
        issue_keys: Vec<String>,
    }

    let mut users: HashMap<String, SummaryAccumulator> = HashMap::new();

    for (issue_key, entries) in worklogs_by_issue {
        for entry in entries {
            let Some(account_id) = entry
                .author
                .as_ref()
                .and_then(|a| a.account_id.as_deref())
            else {
                continue;
            };

            let display_name = entry
                .author
                .as_ref()
                .and_then(|a| a.display_name.clone())
                .unwrap_or_else(|| UNKNOWN_DISPLAY_NAME.to_string());

            let user = users
                .entry(account_id.to_string())
                .or_insert_with(|| SummaryAccumulator {
                    display_name,
                    total_time_seconds: 0,
                    issue_keys: Vec::new(),
                });

            user.total_time_seconds += entry.time_spent_seconds;
            if !user.issue_keys.contains(issue_key) {
                user.issue_keys.push(issue_key.clone());
            }
        }
    }

    let mut user_summaries: Vec<EpicUserSummary> = users
        .into_iter()
        .map(|(account_id, mut acc)| {
            acc.issue_keys.sort();
            EpicUserSummary {
                account_id,
                display_name: acc.display_name,
                total_time_seconds: acc.total_time_seconds,
                issue_keys: acc.issue_keys,
            }
        })
        .collect();
    user_summaries.sort_by(|a, b| b.total_time_seconds.cmp(&a.total_time_seconds));

    let total_time_seconds = user_summaries.iter().map(|u| u.total_time_seconds).sum();

    EpicWorklogReport {
        epic_key: epic_key.to_string(),
        epic_summary: epic_summary.to_string(),
        total_issues: worklogs_by_issue.len(),
        total_time_seconds,
        users: user_summaries,
    }
}
