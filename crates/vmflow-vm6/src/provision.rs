//! ホストのライフサイクル操作
//!
//! 各操作は入場許可を 1 枚取って実行する。照会・ID 予約・リモート変更・
//! 状態待ちまでを含めて「同時実行中の 1 操作」として数えるためで、
//! 許可は操作の終了時 (エラーやパニックを含む) に必ず返却される。

use tracing::{debug, info};

use vmflow_core::{ProviderSession, VmSpec};

use crate::client::Vm6Client;
use crate::error::Result;
use crate::types::{CreateHostRequest, ReconfigureHostRequest, Vm6Host};

/// 作成完了とみなすライフサイクル状態
const STATE_ACTIVE: &str = "active";

/// 1 台分の突き合わせ結果
#[derive(Debug, Clone, PartialEq)]
pub enum EnsureOutcome {
    /// 新規に作成した
    Created(Vm6Host),
    /// 既存ホストを宣言に合わせて再構成した
    Updated(Vm6Host),
    /// 既に宣言どおりで何もしなかった
    Unchanged(Vm6Host),
}

impl EnsureOutcome {
    pub fn host(&self) -> &Vm6Host {
        match self {
            Self::Created(host) | Self::Updated(host) | Self::Unchanged(host) => host,
        }
    }
}

/// VM 1 台を宣言された状態に揃える
///
/// 同名ホストが既にあれば差分を見て再構成し、無ければ ID を確保して
/// 新規作成する。戻り値でどちらの経路を通ったかが分かる。
pub async fn ensure_vm(
    session: &ProviderSession,
    client: &Vm6Client,
    spec: &VmSpec,
) -> Result<EnsureOutcome> {
    let _permit = session.admit().await;
    debug!(vm = %spec.name, in_flight = session.in_flight(), "admitted");

    if let Some(existing) = client.find_host_by_name(&spec.name).await? {
        // 以後の自動採番が既存 ID と衝突しないように水位を上げておく
        session.observe_vm_id(existing.id).await;

        if spec_matches(spec, &existing) {
            debug!(vm = %spec.name, vm_id = existing.id, "host already matches the declaration");
            return Ok(EnsureOutcome::Unchanged(existing));
        }

        client
            .reconfigure_host(existing.id, &reconfigure_request(spec))
            .await?;
        let host = client.wait_host_state(existing.id, STATE_ACTIVE).await?;
        return Ok(EnsureOutcome::Updated(host));
    }

    let vm_id = match spec.vm_id {
        Some(pinned) => {
            session.observe_vm_id(pinned).await;
            pinned
        }
        None => session.allocate_vm_id().await?,
    };

    client.create_host(&create_request(vm_id, spec)).await?;
    let host = client.wait_host_state(vm_id, STATE_ACTIVE).await?;
    info!(vm = %spec.name, vm_id, "host is active");
    Ok(EnsureOutcome::Created(host))
}

/// 名前の一致するホストを削除する (無ければ何もしない)
///
/// 削除したら true、見つからなかったら false を返す。
pub async fn remove_vm(session: &ProviderSession, client: &Vm6Client, name: &str) -> Result<bool> {
    let _permit = session.admit().await;

    let Some(host) = client.find_host_by_name(name).await? else {
        debug!(vm = %name, "no host with this name, nothing to remove");
        return Ok(false);
    };

    client.delete_host(host.id).await?;
    client.wait_host_removed(host.id).await?;
    info!(vm = %name, vm_id = host.id, "host removed");
    Ok(true)
}

/// 宣言とリモートの実体が一致しているか
///
/// API が報告しないフィールドは比較しようがないため一致とみなす。
fn spec_matches(spec: &VmSpec, host: &Vm6Host) -> bool {
    let note_matches = match (&spec.note, &host.note) {
        (None, _) => true,
        (Some(want), Some(have)) => want == have,
        (Some(_), None) => false,
    };
    host.cpu_number.is_none_or(|v| v == spec.cores)
        && host.ram_mib.is_none_or(|v| v == spec.memory_mib)
        && host.disk_gib.is_none_or(|v| v == spec.disk_gib)
        && note_matches
}

fn create_request(vm_id: i64, spec: &VmSpec) -> CreateHostRequest {
    CreateHostRequest {
        id: vm_id,
        name: spec.name.clone(),
        os: spec.os.clone(),
        cpu_number: spec.cores,
        ram_mib: spec.memory_mib,
        disk_gib: spec.disk_gib,
        note: spec.note.clone(),
    }
}

fn reconfigure_request(spec: &VmSpec) -> ReconfigureHostRequest {
    ReconfigureHostRequest {
        cpu_number: spec.cores,
        ram_mib: spec.memory_mib,
        disk_gib: spec.disk_gib,
        note: spec.note.clone(),
    }
}
