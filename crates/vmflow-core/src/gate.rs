//! 同時実行アドミッションゲート
//!
//! リモートAPIへ同時に発行できるプロビジョニング操作数を
//! `max_parallel` 以下に制限します。取得した許可はRAIIパーミットとして
//! 返され、ドロップされた時点で必ず枠が返却されます。

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// 同時実行数の上限を守るゲート
///
/// `acquire()` は空きが出るまで待機します。失敗することはありません。
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    max_parallel: usize,
}

/// 取得済みの実行許可
///
/// 保持している間は同時実行枠を1つ占有し、ドロップで返却されます。
/// 正常終了・エラー・パニック・キャンセルのいずれでも返却は漏れません。
#[derive(Debug)]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    /// 指定した上限でゲートを作成
    pub fn new(max_parallel: usize) -> Self {
        // 上限0は全操作を永久に待機させるため1へ引き上げる
        let max_parallel = max_parallel.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_parallel)),
            max_parallel,
        }
    }

    /// 空きが出るまで待機して実行許可を取得
    pub async fn acquire(&self) -> AdmissionPermit {
        let permit = match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!(
                    max_parallel = self.max_parallel,
                    "admission saturated, waiting for a slot"
                );
                self.semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("admission semaphore is never closed")
            }
        };
        AdmissionPermit { _permit: permit }
    }

    /// 設定された同時実行上限
    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// 現在の空き枠数
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 現在実行中（許可済み）の操作数
    pub fn in_flight(&self) -> usize {
        self.max_parallel
            .saturating_sub(self.semaphore.available_permits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn zero_bound_is_clamped_to_one() {
        let gate = AdmissionGate::new(0);
        assert_eq!(gate.max_parallel(), 1);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn third_acquire_waits_for_a_release() {
        let gate = AdmissionGate::new(2);
        let first = gate.acquire().await;
        let _second = gate.acquire().await;
        assert_eq!(gate.in_flight(), 2);
        assert_eq!(gate.available(), 0);

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.acquire().await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!waiter.is_finished());

        drop(first);
        let _third = waiter.await.unwrap();
        assert_eq!(gate.in_flight(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_bound_under_load() {
        let gate = AdmissionGate::new(4);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let gate = gate.clone();
            let running = running.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _permit = gate.acquire().await;
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert_eq!(running.load(Ordering::SeqCst), 0);
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.available(), 4);
    }

    #[tokio::test]
    async fn aborted_waiter_does_not_leak_a_slot() {
        let gate = AdmissionGate::new(1);
        let held = gate.acquire().await;

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.acquire().await })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        waiter.abort();
        let _ = waiter.await;

        drop(held);
        assert_eq!(gate.in_flight(), 0);

        let _again = gate.acquire().await;
        assert_eq!(gate.in_flight(), 1);
    }
}
