use std::path::Path;

use colored::Colorize;
use futures_util::future::join_all;
use vmflow_vm6::remove_vm;

use crate::utils;

pub async fn handle(file: Option<&Path>, yes: bool) -> anyhow::Result<()> {
    println!("{}", "宣言された VM を削除します...".yellow());
    let (_, set) = utils::load_declared(file)?;

    println!();
    println!("{}", format!("削除対象 ({} 台):", set.vms.len()).bold());
    for vm in &set.vms {
        println!("  • {}", vm.name.cyan());
    }
    println!();

    if !utils::confirm("本当に削除しますか？", yes)? {
        println!("{}", "中止しました".yellow());
        return Ok(());
    }

    let (client, session) = utils::connect_session().await?;
    println!();

    let tasks = set.vms.iter().map(|vm| vm.name.clone()).map(|name| {
        let client = client.clone();
        let session = session.clone();
        tokio::spawn(async move {
            let removed = remove_vm(&session, &client, &name).await;
            (name, removed)
        })
    });
    let results = join_all(tasks).await;

    let mut failed = 0;
    for joined in results {
        let (name, result) = joined?;
        match result {
            Ok(true) => println!("  ✓ {} を削除しました", name.cyan()),
            Ok(false) => println!("  ℹ {} は存在しません", name.cyan()),
            Err(e) => {
                println!("  ⚠ {} の削除に失敗: {}", name.cyan(), e);
                failed += 1;
            }
        }
    }

    println!();
    if failed == 0 {
        println!("{}", "✓ 削除が完了しました".green().bold());
    } else {
        println!(
            "{}",
            format!("✗ {failed} 台の削除に失敗しました").red().bold()
        );
        std::process::exit(1);
    }

    Ok(())
}
