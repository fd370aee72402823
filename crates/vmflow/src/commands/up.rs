use std::path::Path;

use colored::Colorize;
use futures_util::future::join_all;
use vmflow_vm6::{EnsureOutcome, ensure_vm};

use crate::utils;

pub async fn handle(file: Option<&Path>, yes: bool) -> anyhow::Result<()> {
    println!("{}", "VM を宣言どおりに揃えます...".blue());
    let (_, set) = utils::load_declared(file)?;

    println!();
    println!("{}", format!("対象 VM ({} 台):", set.vms.len()).bold());
    for vm in &set.vms {
        let id = match vm.vm_id {
            Some(id) => format!(" (id={id})"),
            None => String::new(),
        };
        println!("  • {}{}", vm.name.cyan(), id);
    }
    println!();

    if !utils::confirm("この内容で適用しますか？", yes)? {
        println!("{}", "中止しました".yellow());
        return Ok(());
    }

    let (client, session) = utils::connect_session().await?;
    println!("同時実行数: {}", session.max_parallel());
    println!();

    // 全 VM を一斉に投げ、同時実行の制限はセッション側に任せる
    let tasks = set.vms.iter().cloned().map(|spec| {
        let client = client.clone();
        let session = session.clone();
        tokio::spawn(async move {
            let name = spec.name.clone();
            (name, ensure_vm(&session, &client, &spec).await)
        })
    });
    let results = join_all(tasks).await;

    let mut failed = 0;
    for joined in results {
        let (name, result) = joined?;
        match result {
            Ok(EnsureOutcome::Created(host)) => {
                println!("  ✓ {} を作成しました (id={})", name.cyan(), host.id);
            }
            Ok(EnsureOutcome::Updated(host)) => {
                println!("  ✓ {} を更新しました (id={})", name.cyan(), host.id);
            }
            Ok(EnsureOutcome::Unchanged(host)) => {
                println!("  ℹ {} は宣言どおりです (id={})", name.cyan(), host.id);
            }
            Err(e) => {
                println!("  ⚠ {} の適用に失敗: {}", name.cyan(), e);
                failed += 1;
            }
        }
    }

    println!();
    if failed == 0 {
        println!("{}", "✓ すべての VM が揃いました".green().bold());
    } else {
        println!(
            "{}",
            format!("✗ {failed} 台の適用に失敗しました").red().bold()
        );
        std::process::exit(1);
    }

    Ok(())
}
