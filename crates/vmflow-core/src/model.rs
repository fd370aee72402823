//! VMリソースモデル
//!
//! vmflowで管理するVMのあるべき状態（desired state）の定義

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};

/// VMひとつ分のあるべき状態
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmSpec {
    /// VM名（定義ファイル内で一意）
    pub name: String,

    /// 明示的に固定するVM ID（省略時は自動割り当て）
    pub vm_id: Option<i64>,

    /// 仮想CPUコア数
    pub cores: u32,

    /// メモリ (MiB)
    pub memory_mib: u64,

    /// ディスクサイズ (GiB)
    pub disk_gib: u64,

    /// OSテンプレート名
    /// 例: "ubuntu-24.04"
    pub os: String,

    /// 備考（リモート側にそのまま保存される）
    pub note: Option<String>,
}

/// `vm` ノードが省略したフィールドへ適用されるデフォルト値
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmDefaults {
    /// 仮想CPUコア数
    pub cores: u32,

    /// メモリ (MiB)
    pub memory_mib: u64,

    /// ディスクサイズ (GiB)
    pub disk_gib: u64,

    /// OSテンプレート名
    pub os: Option<String>,
}

impl Default for VmDefaults {
    fn default() -> Self {
        Self {
            cores: 1,
            memory_mib: 1024,
            disk_gib: 10,
            os: None,
        }
    }
}

/// パース済みのVM定義一式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VmSet {
    /// 定義セット名（ファイル名由来）
    pub name: String,

    /// 定義されたVM（ファイル内の出現順）
    pub vms: Vec<VmSpec>,
}

impl VmSet {
    /// 名前でVM定義を探す
    pub fn find(&self, name: &str) -> Option<&VmSpec> {
        self.vms.iter().find(|vm| vm.name == name)
    }

    /// 定義内容の整合性を検証
    ///
    /// 名前の重複、固定IDの重複・非正値、osの欠落、ゼロ資源を拒否します。
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        let mut pinned = HashSet::new();
        for vm in &self.vms {
            if vm.name.is_empty() {
                return Err(ProvisionError::InvalidConfig(
                    "vm name must not be empty".into(),
                ));
            }
            if !names.insert(vm.name.as_str()) {
                return Err(ProvisionError::InvalidConfig(format!(
                    "duplicate vm name '{}'",
                    vm.name
                )));
            }
            if let Some(id) = vm.vm_id {
                if id <= 0 {
                    return Err(ProvisionError::InvalidConfig(format!(
                        "vm '{}' pins non-positive id {}",
                        vm.name, id
                    )));
                }
                if !pinned.insert(id) {
                    return Err(ProvisionError::InvalidConfig(format!(
                        "vm id {id} is pinned more than once"
                    )));
                }
            }
            if vm.os.is_empty() {
                return Err(ProvisionError::MissingOs(vm.name.clone()));
            }
            if vm.cores == 0 || vm.memory_mib == 0 || vm.disk_gib == 0 {
                return Err(ProvisionError::InvalidConfig(format!(
                    "vm '{}' has zero cores, memory or disk",
                    vm.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm(name: &str, vm_id: Option<i64>) -> VmSpec {
        VmSpec {
            name: name.to_string(),
            vm_id,
            cores: 2,
            memory_mib: 2048,
            disk_gib: 20,
            os: "ubuntu-24.04".to_string(),
            note: None,
        }
    }

    #[test]
    fn valid_set_passes() {
        let set = VmSet {
            name: "test".into(),
            vms: vec![vm("web-01", None), vm("db-01", Some(108))],
        };
        assert!(set.validate().is_ok());
        assert!(set.find("db-01").is_some());
        assert!(set.find("cache-01").is_none());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let set = VmSet {
            name: "test".into(),
            vms: vec![vm("web-01", None), vm("web-01", None)],
        };
        let err = set.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate vm name"));
    }

    #[test]
    fn duplicate_pinned_ids_are_rejected() {
        let set = VmSet {
            name: "test".into(),
            vms: vec![vm("a", Some(7)), vm("b", Some(7))],
        };
        assert!(set.validate().is_err());
    }

    #[test]
    fn missing_os_is_rejected() {
        let mut bad = vm("web-01", None);
        bad.os = String::new();
        let set = VmSet {
            name: "test".into(),
            vms: vec![bad],
        };
        assert!(matches!(
            set.validate(),
            Err(ProvisionError::MissingOs(name)) if name == "web-01"
        ));
    }

    #[test]
    fn zero_resources_are_rejected() {
        let mut bad = vm("web-01", None);
        bad.cores = 0;
        let set = VmSet {
            name: "test".into(),
            vms: vec![bad],
        };
        assert!(set.validate().is_err());
    }
}
