use std::path::Path;

use colored::Colorize;

use crate::utils;

pub async fn handle(file: Option<&Path>) -> anyhow::Result<()> {
    println!("{}", "VM 定義を検証中...".blue());

    match utils::load_declared(file) {
        Ok((_, set)) => {
            println!("{}", "✓ 定義ファイルは正常です！".green().bold());
            println!();
            println!("サマリー:");
            println!("  VM: {}台", set.vms.len());
            for vm in &set.vms {
                let id = match vm.vm_id {
                    Some(id) => id.to_string(),
                    None => "自動".to_string(),
                };
                println!(
                    "    - {} (id: {}, cores: {}, memory: {}MiB, disk: {}GiB, os: {})",
                    vm.name.cyan(),
                    id,
                    vm.cores,
                    vm.memory_mib,
                    vm.disk_gib,
                    vm.os
                );
            }
        }
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 定義エラー".red().bold());
            eprintln!("  {}", e);
            eprintln!();
            eprintln!("vms.kdl のあるディレクトリで実行するか、--file で指定してください");
            std::process::exit(1);
        }
    }

    Ok(())
}
