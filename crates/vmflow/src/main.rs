mod commands;
mod utils;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vmflow")]
#[command(about = "宣言した VM 構成を、そのまま実体に。", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 宣言されたVMをすべて作成・更新
    Up {
        /// VM定義ファイル (省略時は探索)
        #[arg(short, long, env = "VMFLOW_FILE")]
        file: Option<PathBuf>,
        /// 確認プロンプトを省略
        #[arg(short, long)]
        yes: bool,
    },
    /// 宣言されたVMをすべて削除
    Down {
        /// VM定義ファイル (省略時は探索)
        #[arg(short, long, env = "VMFLOW_FILE")]
        file: Option<PathBuf>,
        /// 確認プロンプトを省略
        #[arg(short, long)]
        yes: bool,
    },
    /// 宣言とリモートの対応状況を表示
    Status {
        /// VM定義ファイル (省略時は探索)
        #[arg(short, long, env = "VMFLOW_FILE")]
        file: Option<PathBuf>,
    },
    /// VM定義ファイルを検証
    Validate {
        /// VM定義ファイル (省略時は探索)
        #[arg(short, long, env = "VMFLOW_FILE")]
        file: Option<PathBuf>,
    },
    /// バージョンを表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // VMFLOW_LOG_FILE 指定時はファイルへ、通常は stderr へログ出力
    if let Ok(path) = std::env::var("VMFLOW_LOG_FILE") {
        use std::fs::OpenOptions;
        let log_file = OpenOptions::new().create(true).append(true).open(&path).ok();

        if let Some(file) = log_file {
            tracing_subscriber::fmt()
                .with_writer(file)
                .with_env_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::DEBUG.into()),
                )
                .with_ansi(false)
                .init();
        }
    } else if utils::debug_requested() {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::DEBUG.into()),
            )
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    match cli.command {
        Commands::Up { file, yes } => {
            commands::up::handle(file.as_deref(), yes).await?;
        }
        Commands::Down { file, yes } => {
            commands::down::handle(file.as_deref(), yes).await?;
        }
        Commands::Status { file } => {
            commands::status::handle(file.as_deref()).await?;
        }
        Commands::Validate { file } => {
            commands::validate::handle(file.as_deref()).await?;
        }
        Commands::Version => {
            println!("vmflow {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
