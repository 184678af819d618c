use crate::error::Result;
use crate::models::{Issue, PagedValues, SearchPage};
use futures::future::join_all;
use std::future::Future;

/// オフセットページングの1ページあたりの件数
pub const OFFSET_PAGE_SIZE: u32 = 100;

/// オフセットページングの一覧エンドポイントを全ページ収集する
///
/// 最初のページで`total`を読み、残りのページは並行で取得して
/// ページ順に連結する。`total`が取得中に変わらないことを前提とする。
pub async fn collect_offset_pages<T, F, Fut>(fetch: F) -> Result<Vec<T>>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<PagedValues<T>>>,
{
    let first = fetch(0).await?;
    let total = first.total;
    let page_size = if first.max_results > 0 {
        first.max_results
    } else {
        OFFSET_PAGE_SIZE
    };

    let mut values = first.values;
    if (values.len() as u32) < total {
        let mut offsets = Vec::new();
        let mut offset = page_size;
        while offset < total {
            offsets.push(offset);
            offset += page_size;
        }

        let pages = join_all(offsets.into_iter().map(&fetch)).await;
        for page in pages {
            values.extend(page?.values);
        }
    }

    Ok(values)
}

/// トークンページングの検索エンドポイントを全ページ収集する
///
/// 各リクエストは前ページのトークンに依存するため、必ず直列に実行する。
pub async fn collect_search_pages<F, Fut>(fetch: F) -> Result<Vec<Issue>>
where
    F: Fn(Option<String>) -> Fut,
    Fut: Future<Output = Result<SearchPage>>,
{
    let mut issues = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let page = fetch(token.take()).await?;
        issues.extend(page.issues);

        match page.next_page_token {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn page_of(start: u32, total: u32, page_size: u32) -> PagedValues<u32> {
        let end = (start + page_size).min(total);
        PagedValues {
            start_at: start,
            max_results: page_size,
            total,
            is_last: Some(end >= total),
            values: (start..end).collect(),
        }
    }

    #[tokio::test]
    async fn test_offset_walker_collects_all_pages() {
        // Given: total=250、ページサイズ100のエンドポイント
        let request_count = Arc::new(AtomicUsize::new(0));
        let counter = request_count.clone();

        // When: 全ページ収集
        let values = collect_offset_pages(|offset| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(page_of(offset, 250, 100))
            }
        })
        .await
        .unwrap();

        // Then: ちょうど3リクエストで250件、順序は保持される
        assert_eq!(request_count.load(Ordering::SeqCst), 3);
        assert_eq!(values.len(), 250);
        assert_eq!(values, (0..250).collect::<Vec<u32>>());
    }

    #[tokio::test]
    async fn test_offset_walker_single_page() {
        let request_count = Arc::new(AtomicUsize::new(0));
        let counter = request_count.clone();

        let values = collect_offset_pages(|offset| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(page_of(offset, 40, 100))
            }
        })
        .await
        .unwrap();

        assert_eq!(request_count.load(Ordering::SeqCst), 1);
        assert_eq!(values.len(), 40);
    }

    #[tokio::test]
    async fn test_offset_walker_empty_result() {
        let values: Vec<u32> = collect_offset_pages(|offset| async move {
            Ok(page_of(offset, 0, 100))
        })
        .await
        .unwrap();

        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_offset_walker_propagates_page_error() {
        let result: Result<Vec<u32>> = collect_offset_pages(|offset| async move {
            if offset == 100 {
                Err(Error::Unexpected("page failed".to_string()))
            } else {
                Ok(page_of(offset, 250, 100))
            }
        })
        .await;

        assert!(result.is_err());
    }

    fn issue(key: &str) -> Issue {
        serde_json::from_value(serde_json::json!({
            "key": key,
            "fields": { "summary": key }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_token_walker_follows_tokens_sequentially() {
        // Given: トークンを2回返す検索エンドポイント
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let log = calls.clone();

        let issues = collect_search_pages(|token| {
            let log = log.clone();
            async move {
                log.lock().unwrap().push(token.clone());
                match token.as_deref() {
                    None => Ok(SearchPage {
                        issues: vec![issue("A-1")],
                        next_page_token: Some("t1".to_string()),
                        is_last: Some(false),
                        total: None,
                    }),
                    Some("t1") => Ok(SearchPage {
                        issues: vec![issue("A-2")],
                        next_page_token: Some("t2".to_string()),
                        is_last: Some(false),
                        total: None,
                    }),
                    _ => Ok(SearchPage {
                        issues: vec![issue("A-3")],
                        next_page_token: None,
                        is_last: Some(true),
                        total: None,
                    }),
                }
            }
        })
        .await
        .unwrap();

        // Then: トークンが順に渡り、全Issueが集まる
        let keys: Vec<_> = issues.iter().map(|i| i.key.clone()).collect();
        assert_eq!(keys, vec!["A-1", "A-2", "A-3"]);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![None, Some("t1".to_string()), Some("t2".to_string())]
        );
    }

    #[tokio::test]
    async fn test_token_walker_single_page() {
        let issues = collect_search_pages(|_token| async move {
            Ok(SearchPage {
                issues: vec![issue("B-1")],
                next_page_token: None,
                is_last: Some(true),
                total: Some(1),
            })
        })
        .await
        .unwrap();

        assert_eq!(issues.len(), 1);
    }
}
