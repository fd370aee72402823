use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use vmflow_core::{ProviderSession, VmSet};
use vmflow_vm6::{Vm6Client, Vm6Config};

/// VM6_DEBUG が真値ならデバッグログを有効にする
pub fn debug_requested() -> bool {
    std::env::var("VM6_DEBUG").is_ok_and(|raw| {
        matches!(
            raw.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

/// 定義ファイルを決定して読み込む (--file 指定が無ければ探索)
pub fn load_declared(file: Option<&Path>) -> anyhow::Result<(PathBuf, VmSet)> {
    let path = match file {
        Some(explicit) => explicit.to_path_buf(),
        None => vmflow_core::find_vms_file()?,
    };
    println!("定義ファイル: {}", path.display().to_string().cyan());
    let set = vmflow_core::load_vms_from(&path)?;
    Ok((path, set))
}

/// API へ接続し、同時実行の上限を共有するセッションを作る
pub async fn connect_session() -> anyhow::Result<(Arc<Vm6Client>, Arc<ProviderSession>)> {
    let config = Vm6Config::from_env()?;
    println!("接続先: {}", config.api_url.cyan());

    let client = Arc::new(Vm6Client::connect(&config).await?);
    let session = Arc::new(ProviderSession::new(
        config.session_config(),
        client.clone(),
    ));
    Ok((client, session))
}

/// y/N の確認プロンプト。--yes 指定時は常に true
pub fn confirm(prompt: &str, assume_yes: bool) -> anyhow::Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    print!("{prompt} [y/N]: ");
    use std::io::Write;
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
