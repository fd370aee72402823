//! VM定義ファイルの発見と読み込み
//!
//! 以下の優先順位で定義ファイルを検索:
//! 1. 環境変数 VMFLOW_FILE（直接パス指定）
//! 2. カレントディレクトリ: vms.local.kdl, vms.kdl, vmflow.kdl
//! 3. ./.vmflow/ ディレクトリ内: 同様の順序
//! 4. ~/.config/vmflow/vms.kdl（グローバル設定）

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ProvisionError, Result};
use crate::model::VmSet;
use crate::parser::parse_vms_file;

const CANDIDATES: [&str; 3] = ["vms.local.kdl", "vms.kdl", "vmflow.kdl"];

/// VM定義ファイルを探す
pub fn find_vms_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(path) = std::env::var("VMFLOW_FILE") {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;
    find_vms_file_from(&current_dir)
}

/// 指定ディレクトリを起点にVM定義ファイルを探す
pub fn find_vms_file_from(dir: &Path) -> Result<PathBuf> {
    // 2. 起点ディレクトリで検索
    for filename in &CANDIDATES {
        let path = dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    // 3. ./.vmflow/ ディレクトリで検索
    let vmflow_dir = dir.join(".vmflow");
    if vmflow_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = vmflow_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    // 4. グローバル設定 (~/.config/vmflow/vms.kdl)
    if let Some(config_dir) = dirs::config_dir() {
        let global = config_dir.join("vmflow").join("vms.kdl");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ProvisionError::DefinitionNotFound(dir.to_path_buf()))
}

/// VM定義ファイルを発見してロード
pub fn load_vms() -> Result<VmSet> {
    let path = find_vms_file()?;
    load_vms_from(&path)
}

/// 指定ファイルからVM定義をロード
pub fn load_vms_from(path: &Path) -> Result<VmSet> {
    debug!(file = %path.display(), "loading VM definitions");
    let set = parse_vms_file(path)?;
    info!(file = %path.display(), vms = set.vms.len(), "VM definitions loaded");
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_find_vms_file_in_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("vms.kdl"), "// test").unwrap();

        let found = find_vms_file_from(temp_dir.path()).unwrap();
        assert!(found.ends_with("vms.kdl"));
    }

    #[test]
    fn test_local_file_takes_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("vms.kdl"), "// shared").unwrap();
        fs::write(temp_dir.path().join("vms.local.kdl"), "// local").unwrap();

        let found = find_vms_file_from(temp_dir.path()).unwrap();
        assert!(found.ends_with("vms.local.kdl"));
    }

    #[test]
    fn test_find_vms_file_in_hidden_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let hidden = temp_dir.path().join(".vmflow");
        fs::create_dir(&hidden).unwrap();
        fs::write(hidden.join("vms.kdl"), "// in .vmflow").unwrap();

        let found = find_vms_file_from(temp_dir.path()).unwrap();
        assert!(found.ends_with(".vmflow/vms.kdl"));
    }

    #[test]
    fn test_not_found_reports_start_dir() {
        let temp_dir = tempfile::tempdir().unwrap();

        let result = find_vms_file_from(temp_dir.path());
        assert!(matches!(
            result,
            Err(ProvisionError::DefinitionNotFound(dir)) if dir == temp_dir.path()
        ));
    }

    #[test]
    #[serial]
    fn test_env_var_overrides_discovery() {
        let temp_dir = tempfile::tempdir().unwrap();
        let custom = temp_dir.path().join("custom.kdl");
        fs::write(&custom, "// custom").unwrap();

        unsafe {
            std::env::set_var("VMFLOW_FILE", custom.to_str().unwrap());
        }

        let found = find_vms_file().unwrap();
        assert_eq!(found, custom);

        unsafe {
            std::env::remove_var("VMFLOW_FILE");
        }
    }

    #[test]
    fn test_load_vms_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("vms.kdl");
        fs::write(
            &path,
            r#"
            defaults {
                os "ubuntu-24.04"
            }
            vm "web-01" {
                cores 2
            }
            "#,
        )
        .unwrap();

        let set = load_vms_from(&path).unwrap();
        assert_eq!(set.name, "vms");
        assert_eq!(set.vms.len(), 1);
        assert_eq!(set.vms[0].os, "ubuntu-24.04");
    }
}
