//! VM定義ドキュメントのパース
//!
//! vms.kdl をパースして [`VmSet`] を生成します。`defaults` ノードの値は
//! 各 `vm` ノードが省略したフィールドへ適用されます。

use std::fs;
use std::path::Path;

use kdl::{KdlDocument, KdlNode};

use crate::error::{ProvisionError, Result};
use crate::model::{VmDefaults, VmSet, VmSpec};

/// KDLファイルをパースしてVM定義一式を生成
pub fn parse_vms_file<P: AsRef<Path>>(path: P) -> Result<VmSet> {
    let content = fs::read_to_string(path.as_ref())?;
    let name = path
        .as_ref()
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_vms_document(&content, name)
}

/// KDL文字列をパースしてVM定義一式を生成
pub fn parse_vms_document(content: &str, name: String) -> Result<VmSet> {
    let doc: KdlDocument = content.parse()?;

    // defaults は出現位置に依存させないため先に集める
    let mut defaults = VmDefaults::default();
    for node in doc.nodes() {
        if node.name().value() == "defaults" {
            apply_defaults(node, &mut defaults);
        }
    }

    let mut set = VmSet {
        name,
        vms: Vec::new(),
    };
    for node in doc.nodes() {
        match node.name().value() {
            "vm" => {
                set.vms.push(parse_vm(node, &defaults)?);
            }
            "defaults" => {}
            other => {
                return Err(ProvisionError::InvalidConfig(format!(
                    "unknown top-level node '{other}' (expected vm or defaults)"
                )));
            }
        }
    }

    set.validate()?;
    Ok(set)
}

/// vm ノードをパース
pub fn parse_vm(node: &KdlNode, defaults: &VmDefaults) -> Result<VmSpec> {
    let name = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| ProvisionError::InvalidConfig("vm requires a name".to_string()))?
        .to_string();

    let mut vm = VmSpec {
        name: name.clone(),
        vm_id: property_integer(node, "id"),
        cores: defaults.cores,
        memory_mib: defaults.memory_mib,
        disk_gib: defaults.disk_gib,
        os: defaults.os.clone().unwrap_or_default(),
        note: None,
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                // id はプロパティ形式 (id=108) と子ノード形式の両方を受ける
                "id" => {
                    vm.vm_id = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_integer())
                        .map(|v| v as i64);
                }
                "cores" | "cpu" => {
                    if let Some(v) = child.entries().first().and_then(|e| e.value().as_integer()) {
                        vm.cores = v as u32;
                    }
                }
                "memory" | "memory_mib" | "memory-mib" => {
                    if let Some(v) = child.entries().first().and_then(|e| e.value().as_integer()) {
                        vm.memory_mib = v as u64;
                    }
                }
                "disk" | "disk_gib" | "disk-gib" => {
                    if let Some(v) = child.entries().first().and_then(|e| e.value().as_integer()) {
                        vm.disk_gib = v as u64;
                    }
                }
                "os" | "template" => {
                    if let Some(v) = child.entries().first().and_then(|e| e.value().as_string()) {
                        vm.os = v.to_string();
                    }
                }
                "note" | "description" => {
                    vm.note = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                other => {
                    return Err(ProvisionError::InvalidConfig(format!(
                        "vm '{name}' has unknown field '{other}'"
                    )));
                }
            }
        }
    }

    Ok(vm)
}

/// defaults ノードの値を取り込む
fn apply_defaults(node: &KdlNode, defaults: &mut VmDefaults) {
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "cores" | "cpu" => {
                    if let Some(v) = child.entries().first().and_then(|e| e.value().as_integer()) {
                        defaults.cores = v as u32;
                    }
                }
                "memory" | "memory_mib" | "memory-mib" => {
                    if let Some(v) = child.entries().first().and_then(|e| e.value().as_integer()) {
                        defaults.memory_mib = v as u64;
                    }
                }
                "disk" | "disk_gib" | "disk-gib" => {
                    if let Some(v) = child.entries().first().and_then(|e| e.value().as_integer()) {
                        defaults.disk_gib = v as u64;
                    }
                }
                "os" | "template" => {
                    defaults.os = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                _ => {}
            }
        }
    }
}

/// ノードの名前付きエントリ (key=value) から整数を取り出す
fn property_integer(node: &KdlNode, key: &str) -> Option<i64> {
    node.entries().iter().find_map(|e| match e.name() {
        Some(name) if name.value() == key => e.value().as_integer().map(|v| v as i64),
        _ => None,
    })
}
