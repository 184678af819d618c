/// エラーシナリオテスト
///
/// 上流の失敗に対する各経路の振る舞いを検証します：
/// 1. 主経路のエラーはそのまま伝播する
/// 2. ファンアウト中の個別Issueの失敗はレポートを壊さない
/// 3. ボード解決の失敗は縮退する（プロジェクト代替→空レポート）
use jira_reports::{Credentials, Error, WorklogService};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_credentials(base_url: &str) -> Credentials {
    Credentials::new(base_url, "test@example.com", "mock-api-token").unwrap()
}

async fn mount_myself(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/api/3/myself"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accountId": "acc-a",
            "displayName": "User A"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_primary_search_failure_propagates() {
    // Given: 検索が500を返す
    let mock_server = MockServer::start().await;
    mount_myself(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/rest/api/3/search/jql"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal error"))
        .mount(&mock_server)
        .await;

    let credentials = mock_credentials(&mock_server.uri());
    let service = WorklogService::new().unwrap();

    // When: レポートを要求する
    let result = service
        .get_monthly_report(
            &credentials,
            "2024-01-01".parse().unwrap(),
            "2024-01-31".parse().unwrap(),
        )
        .await;

    // Then: 主経路のエラーはそのまま呼び出し元に届く
    match result.unwrap_err() {
        Error::ApiError { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Internal error");
        }
        other => panic!("Expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_current_user_auth_failure_propagates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/api/3/myself"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&mock_server)
        .await;

    let credentials = mock_credentials(&mock_server.uri());
    let service = WorklogService::new().unwrap();

    let result = service.get_current_user(&credentials).await;

    match result.unwrap_err() {
        Error::ApiError { status, .. } => assert_eq!(status, 401),
        other => panic!("Expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fanout_worklog_failure_contributes_empty_list() {
    // Given: 片方のIssueのワークログ取得だけが失敗する
    let mock_server = MockServer::start().await;
    mount_myself(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/rest/api/3/search/jql"))
        .and(body_partial_json(json!({
            "jql": "worklogAuthor = currentUser() AND worklogDate >= \"2024-01-01\" AND worklogDate <= \"2024-01-31\" ORDER BY updated DESC"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [{
                "key": "TASK-1",
                "fields": {
                    "summary": "Good task",
                    "parent": { "key": "EPIC-1", "fields": { "summary": "The epic" } }
                }
            }]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/api/3/search/jql"))
        .and(body_partial_json(json!({
            "jql": "parent in (\"EPIC-1\") ORDER BY parent ASC"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [
                {
                    "key": "TASK-1",
                    "fields": {
                        "summary": "Good task",
                        "parent": { "key": "EPIC-1", "fields": { "summary": "The epic" } }
                    }
                },
                {
                    "key": "TASK-2",
                    "fields": {
                        "summary": "Broken task",
                        "parent": { "key": "EPIC-1", "fields": { "summary": "The epic" } }
                    }
                }
            ]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/TASK-1/worklog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "worklogs": [{
                "author": { "accountId": "acc-a", "displayName": "User A" },
                "timeSpentSeconds": 3600,
                "started": "2024-01-05T10:00:00.000+0000"
            }]
        })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/api/3/issue/TASK-2/worklog"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let credentials = mock_credentials(&mock_server.uri());
    let service = WorklogService::new().unwrap();

    // When: レポートを要求する
    let report = service
        .get_monthly_report(
            &credentials,
            "2024-01-01".parse().unwrap(),
            "2024-01-31".parse().unwrap(),
        )
        .await
        .unwrap();

    // Then: 失敗したIssueは0秒扱いでレポート自体は成功する
    assert_eq!(report.total_time_seconds, 3600);
    assert_eq!(report.epics.len(), 1);
    assert_eq!(report.epics[0].users[0].issues.len(), 1);
    assert_eq!(report.epics[0].users[0].issues[0].issue_key, "TASK-1");
}

#[tokio::test]
async fn test_board_configuration_failure_falls_back_to_project() {
    // Given: ボード設定は500、ボード本体はプロジェクトを持つ
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/42/configuration"))
        .respond_with(ResponseTemplate::new(500).set_body_string("config broken"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42,
            "name": "Team Board",
            "location": { "projectKey": "TEST" }
        })))
        .mount(&mock_server)
        .await;

    // プロジェクトによる代替JQLで検索される
    Mock::given(method("POST"))
        .and(path("/rest/api/3/search/jql"))
        .and(body_partial_json(json!({
            "jql": "project = \"TEST\" AND worklogDate >= \"2024-02-01\" AND worklogDate <= \"2024-02-29\" ORDER BY updated DESC"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [{
                "key": "TASK-5",
                "fields": {
                    "summary": "Board task",
                    "parent": { "key": "EPIC-7", "fields": { "summary": "Board epic" } },
                    "worklog": {
                        "startAt": 0,
                        "maxResults": 20,
                        "total": 1,
                        "worklogs": [{
                            "author": { "accountId": "acc-a", "displayName": "User A" },
                            "timeSpentSeconds": 900,
                            "started": "2024-02-10T10:00:00.000+0000"
                        }]
                    }
                }
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let credentials = mock_credentials(&mock_server.uri());
    let service = WorklogService::new().unwrap();

    // When: ボードレポートを要求する
    let report = service
        .get_monthly_report_by_board(
            &credentials,
            42,
            "2024-02-01".parse().unwrap(),
            "2024-02-29".parse().unwrap(),
        )
        .await
        .unwrap();

    // Then: プロジェクト経由で組み立てられる
    assert_eq!(report.total_time_seconds, 900);
    assert_eq!(report.epics[0].epic_key, "EPIC-7");
    mock_server.verify().await;
}

#[tokio::test]
async fn test_board_without_filter_or_project_returns_empty_report() {
    // Given: フィルターもプロジェクトも無いボード
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/7/configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7 })))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/agile/1.0/board/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "name": "Detached board"
        })))
        .mount(&mock_server)
        .await;

    let credentials = mock_credentials(&mock_server.uri());
    let service = WorklogService::new().unwrap();

    // When: ボードレポートを要求する
    let report = service
        .get_monthly_report_by_board(
            &credentials,
            7,
            "2024-02-01".parse().unwrap(),
            "2024-02-29".parse().unwrap(),
        )
        .await
        .unwrap();

    // Then: ハードエラーではなく空のレポート
    assert_eq!(report.total_time_seconds, 0);
    assert!(report.epics.is_empty());
}

#[tokio::test]
async fn test_create_worklog_error_propagates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/api/3/issue/TASK-1/worklog"))
        .respond_with(ResponseTemplate::new(400).set_body_string("timeSpentSeconds is required"))
        .mount(&mock_server)
        .await;

    let credentials = mock_credentials(&mock_server.uri());
    let service = WorklogService::new().unwrap();

    let result = service
        .create_worklog(&credentials, "TASK-1", &json!({ "comment": "no time" }))
        .await;

    match result.unwrap_err() {
        Error::ApiError { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("timeSpentSeconds"));
        }
        other => panic!("Expected ApiError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_delete_worklog_maps_empty_body_to_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/api/3/issue/TASK-1/worklog/100"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let credentials = mock_credentials(&mock_server.uri());
    let service = WorklogService::new().unwrap();

    let result = service
        .delete_worklog(&credentials, "TASK-1", "100")
        .await
        .unwrap();

    assert_eq!(result, json!({ "success": true }));
}

#[tokio::test]
async fn test_update_worklog_passes_response_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/rest/api/3/issue/TASK-1/worklog/100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "100",
            "timeSpentSeconds": 7200
        })))
        .mount(&mock_server)
        .await;

    let credentials = mock_credentials(&mock_server.uri());
    let service = WorklogService::new().unwrap();

    let result = service
        .update_worklog(
            &credentials,
            "TASK-1",
            "100",
            &json!({ "timeSpentSeconds": 7200 }),
        )
        .await
        .unwrap();

    assert_eq!(result["id"], "100");
    assert_eq!(result["timeSpentSeconds"], 7200);
}
