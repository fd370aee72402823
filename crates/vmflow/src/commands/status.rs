use std::collections::HashSet;
use std::path::Path;

use colored::Colorize;
use vmflow_vm6::{Vm6Client, Vm6Config};

use crate::utils;

pub async fn handle(file: Option<&Path>) -> anyhow::Result<()> {
    let (_, set) = utils::load_declared(file)?;

    let config = Vm6Config::from_env()?;
    println!("接続先: {}", config.api_url.cyan());

    let client = Vm6Client::connect(&config).await?;
    let hosts = client.list_hosts().await?;

    println!();
    println!("{}", format!("宣言された VM ({} 台):", set.vms.len()).bold());
    for vm in &set.vms {
        match hosts.iter().find(|host| host.name == vm.name) {
            Some(host) => {
                let state = match host.state.as_str() {
                    "active" => host.state.green(),
                    "creating" | "deleting" | "configuring" => host.state.yellow(),
                    _ => host.state.red(),
                };
                let ip = host.ip4.as_deref().unwrap_or("-");
                println!(
                    "  ● {} (id={}, state={}, ip={})",
                    vm.name.cyan(),
                    host.id,
                    state,
                    ip
                );
            }
            None => {
                println!("  ○ {} (未作成)", vm.name.cyan());
            }
        }
    }

    // 宣言に含まれないホストも見えるようにしておく
    let declared: HashSet<&str> = set.vms.iter().map(|vm| vm.name.as_str()).collect();
    let unmanaged: Vec<_> = hosts
        .iter()
        .filter(|host| !declared.contains(host.name.as_str()))
        .collect();
    if !unmanaged.is_empty() {
        println!();
        println!(
            "{}",
            format!("宣言にない VM ({} 台):", unmanaged.len()).bold()
        );
        for host in unmanaged {
            println!(
                "  - {} (id={}, state={})",
                host.name,
                host.id,
                host.state
            );
        }
    }

    Ok(())
}
