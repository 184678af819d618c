use crate::error::Result;
use futures::future::join_all;
use std::future::Future;

/// バッチ実行のデフォルト並行数
pub const DEFAULT_CONCURRENCY: usize = 6;

/// 要素列に非同期処理を適用し、並行数を制限しながら結果を入力順で返す
///
/// 要素列は`concurrency`個ずつのチャンクに区切られる。チャンク内は並行、
/// チャンク同士は直列。1要素の失敗はバッチ全体を失敗させるため、要素単位の
/// 回復が必要な呼び出し側は`f`の中で捕捉すること。
pub async fn process_batch<T, R, F, Fut>(items: Vec<T>, concurrency: usize, f: F) -> Result<Vec<R>>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = Result<R>>,
{
    let concurrency = concurrency.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut remaining = items.into_iter();

    loop {
        let chunk: Vec<T> = remaining.by_ref().take(concurrency).collect();
        if chunk.is_empty() {
            break;
        }

        // チャンク内の全要素が完了してから次のチャンクへ進む
        let settled = join_all(chunk.into_iter().map(&f)).await;
        for outcome in settled {
            results.push(outcome?);
        }
    }

    Ok(results)
}
