//! VM識別子アロケータ
//!
//! セッション内で衝突しないVM IDを払い出します。リモートAPIには
//! 「次の空きIDを原子的に割り当てる」操作がないため、リモート呼び出しの
//! 前にここでIDを予約します。使用中の最高IDはロック下で遅延発見され
//! （セッションにつき実質1回）、以後はインクリメントのみです。

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Result;

/// 最高IDをまだ発見していないことを表す番兵値
pub const UNDISCOVERED: i64 = -1;

/// 使用中VM IDの問い合わせ先
///
/// リモートAPIの「既存VM一覧」をここでは最高IDひとつに縮約しています。
/// 実装は失敗を [`crate::error::ProvisionError::Discovery`] として
/// 返してください。
#[async_trait]
pub trait VmIdSource: Send + Sync {
    /// 現在使用中の最高VM ID（VMがひとつもなければ0）
    async fn max_in_use_id(&self) -> Result<i64>;
}

/// セッション単位のVM IDアロケータ
#[derive(Debug)]
pub struct VmIdAllocator {
    watermark: Mutex<i64>,
}

impl VmIdAllocator {
    /// 初期ウォーターマークを指定して作成（未発見なら [`UNDISCOVERED`]）
    pub fn new(initial: i64) -> Self {
        Self {
            watermark: Mutex::new(initial),
        }
    }

    /// 新しい一意なVM IDを予約して返す
    ///
    /// ウォーターマークが未発見の場合、ロックを保持したまま `source` に
    /// 問い合わせます。同時に走った初回割り当てはこのロックで直列化される
    /// ため、発見が複数回走ることはありません。発見に失敗したときは状態を
    /// 変えずにエラーを返すので、次の呼び出しが発見をやり直せます。
    pub async fn next_id(&self, source: &dyn VmIdSource) -> Result<i64> {
        let mut watermark = self.watermark.lock().await;
        if *watermark == UNDISCOVERED {
            let discovered = source.max_in_use_id().await?;
            *watermark = discovered;
            tracing::debug!(max_vmid = discovered, "discovered highest VM id in use");
        }
        *watermark += 1;
        tracing::trace!(vm_id = *watermark, "reserved VM id");
        Ok(*watermark)
    }

    /// 外部で決まったIDを報告してウォーターマークを引き上げる
    ///
    /// `id` が現在値以下の場合は何もしません。下げる操作はありません。
    pub async fn observe(&self, id: i64) {
        let mut watermark = self.watermark.lock().await;
        if id > *watermark {
            tracing::debug!(from = *watermark, to = id, "raising VM id watermark");
            *watermark = id;
        }
    }

    /// 現在のウォーターマーク
    pub async fn current(&self) -> i64 {
        *self.watermark.lock().await
    }
}
