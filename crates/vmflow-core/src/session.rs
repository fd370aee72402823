//! プロバイダーセッション
//!
//! ゲートとアロケータを束ねた、セッション単位の明示的なコンテキスト。
//! プロバイダー設定時に一度だけ作られ、各ライフサイクル操作へ参照で
//! 渡されます。グローバル状態を持たないため、1プロセス内に独立した
//! セッションを複数共存させられます（テスト容易性のため）。

use std::future::Future;
use std::sync::Arc;

use crate::allocator::{UNDISCOVERED, VmIdAllocator, VmIdSource};
use crate::error::Result;
use crate::gate::{AdmissionGate, AdmissionPermit};

/// セッションの調整パラメータ
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// 同時実行の上限（1以上）
    pub max_parallel: usize,
    /// ウォーターマークの初期値（未発見なら [`UNDISCOVERED`]）
    pub initial_max_vmid: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_parallel: 4,
            initial_max_vmid: UNDISCOVERED,
        }
    }
}

/// プロビジョニング操作が共有するセッションコンテキスト
pub struct ProviderSession {
    gate: AdmissionGate,
    allocator: VmIdAllocator,
    id_source: Arc<dyn VmIdSource>,
}

const _: () = {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ProviderSession>();
};

impl ProviderSession {
    /// 設定とID問い合わせ先からセッションを作成
    pub fn new(config: SessionConfig, id_source: Arc<dyn VmIdSource>) -> Self {
        tracing::debug!(
            max_parallel = config.max_parallel,
            initial_max_vmid = config.initial_max_vmid,
            "provider session created"
        );
        Self {
            gate: AdmissionGate::new(config.max_parallel),
            allocator: VmIdAllocator::new(config.initial_max_vmid),
            id_source,
        }
    }

    /// 実行許可を取得（空きが出るまで待機）
    ///
    /// 返されたパーミットは操作の間保持してください。正常終了・エラー・
    /// パニック・キャンセルのどの経路でも、ドロップ時に枠が返却されます。
    pub async fn admit(&self) -> AdmissionPermit {
        self.gate.acquire().await
    }

    /// アドミッション下で操作を実行
    ///
    /// `operation` は許可が取れてから走り、終わり方によらず枠は返却
    /// されます。[`Self::admit`] のクロージャ版です。
    pub async fn with_admission<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self.gate.acquire().await;
        operation().await
    }

    /// 新しい一意なVM IDを予約して返す
    pub async fn allocate_vm_id(&self) -> Result<i64> {
        self.allocator.next_id(self.id_source.as_ref()).await
    }

    /// 外部で決まったVM IDを報告する
    ///
    /// 以後の自動割り当てがこのIDを跨がないよう、ウォーターマークを
    /// 必要に応じて引き上げます。
    pub async fn observe_vm_id(&self, id: i64) {
        self.allocator.observe(id).await
    }

    /// 現在のウォーターマーク（診断用）
    pub async fn current_max_vmid(&self) -> i64 {
        self.allocator.current().await
    }

    /// 同時実行の上限
    pub fn max_parallel(&self) -> usize {
        self.gate.max_parallel()
    }

    /// 現在実行中の操作数
    pub fn in_flight(&self) -> usize {
        self.gate.in_flight()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProvisionError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        max_id: i64,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(max_id: i64) -> Self {
            Self {
                max_id,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VmIdSource for StaticSource {
        async fn max_in_use_id(&self) -> Result<i64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.max_id)
        }
    }

    fn session_with(max_parallel: usize, source_max: i64) -> ProviderSession {
        ProviderSession::new(
            SessionConfig {
                max_parallel,
                initial_max_vmid: UNDISCOVERED,
            },
            Arc::new(StaticSource::new(source_max)),
        )
    }

    #[tokio::test]
    async fn allocates_and_observes_through_the_session() {
        let session = session_with(4, 107);

        assert_eq!(session.allocate_vm_id().await.unwrap(), 108);
        session.observe_vm_id(500).await;
        assert_eq!(session.allocate_vm_id().await.unwrap(), 501);
        assert_eq!(session.current_max_vmid().await, 501);
    }

    #[tokio::test]
    async fn with_admission_releases_on_error() {
        let session = session_with(1, 0);

        let result: std::result::Result<(), ProvisionError> = session
            .with_admission(|| async { Err(ProvisionError::InvalidConfig("boom".into())) })
            .await;
        assert!(result.is_err());
        assert_eq!(session.in_flight(), 0);

        // 枠が戻っていれば次の操作は待たずに通る
        let value = session.with_admission(|| async { 1 }).await;
        assert_eq!(value, 1);
    }

    #[tokio::test]
    async fn with_admission_releases_after_panic() {
        let session = Arc::new(session_with(1, 0));

        let task = {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .with_admission(|| async { panic!("operation blew up") })
                    .await
            })
        };
        let joined = task.await;
        assert!(joined.is_err());

        assert_eq!(session.in_flight(), 0);
        let _permit = session.admit().await;
        assert_eq!(session.in_flight(), 1);
    }

    #[tokio::test]
    async fn sessions_are_independent() {
        let a = session_with(2, 10);
        let b = session_with(2, 200);

        assert_eq!(a.allocate_vm_id().await.unwrap(), 11);
        assert_eq!(b.allocate_vm_id().await.unwrap(), 201);
        assert_eq!(a.allocate_vm_id().await.unwrap(), 12);

        let _permit_a = a.admit().await;
        assert_eq!(a.in_flight(), 1);
        assert_eq!(b.in_flight(), 0);
    }

    #[tokio::test]
    async fn default_config_matches_the_documented_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.max_parallel, 4);
        assert_eq!(config.initial_max_vmid, UNDISCOVERED);
    }
}
