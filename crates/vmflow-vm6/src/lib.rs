//! vmflow の VMmanager 6 プロバイダ
//!
//! VMmanager 6 系の REST API に対する認証済みクライアントと、宣言された
//! VM 集合をリモートの実体に揃えるライフサイクル操作を提供する。
//! 同時実行の上限と VM ID の採番は `vmflow-core` のセッションが担う。
//!
//! # 必要な環境変数
//!
//! - `VM6_API_URL` : API ベース URL (必須)
//! - `VM6_API_TOKEN` または `VM6_EMAIL` + `VM6_PASSWORD` : 認証手段
//!
//! # 使用例
//!
//! ```ignore
//! use std::sync::Arc;
//! use vmflow_core::ProviderSession;
//! use vmflow_vm6::{Vm6Client, Vm6Config, ensure_vm};
//!
//! let config = Vm6Config::from_env()?;
//! let client = Arc::new(Vm6Client::connect(&config).await?);
//! let session = ProviderSession::new(config.session_config(), client.clone());
//!
//! let outcome = ensure_vm(&session, &client, &spec).await?;
//! println!("{}: {:?}", spec.name, outcome);
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod provision;
pub mod types;

pub use client::Vm6Client;
pub use config::{DEFAULT_MAX_PARALLEL, DEFAULT_TIMEOUT_SECS, Vm6Config};
pub use error::{Result, Vm6Error};
pub use provision::{EnsureOutcome, ensure_vm, remove_vm};
pub use types::{CreateHostRequest, HostList, ReconfigureHostRequest, TaskResponse, Vm6Host};
