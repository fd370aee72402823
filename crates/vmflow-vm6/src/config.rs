//! VMmanager 接続設定
//!
//! すべて `VM6_*` 環境変数から読み込む。API トークンが無い場合は
//! メールアドレスとパスワードで認証エンドポイントからトークンを取得する。

use vmflow_core::{SessionConfig, UNDISCOVERED};

use crate::error::{Result, Vm6Error};

/// 同時実行数のデフォルト値
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// API 操作の待ち時間デフォルト(秒)
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// VMmanager 6 エンドポイントへの接続設定
#[derive(Debug, Clone)]
pub struct Vm6Config {
    /// API のベース URL (例: `https://vm.example.com/vm/v3`)
    pub api_url: String,

    /// 認証エンドポイントの明示指定 (省略時は `api_url` から導出)
    pub auth_url: Option<String>,

    /// 認証用メールアドレス
    pub email: Option<String>,

    /// 認証用パスワード
    pub password: Option<String>,

    /// 事前発行された API トークン (あれば認証をスキップ)
    pub api_token: Option<String>,

    /// プロビジョニング操作の同時実行数上限
    pub max_parallel: usize,

    /// TLS 証明書の検証を無効にするか (検証環境向けデフォルト: true)
    pub tls_insecure: bool,

    /// API 操作・状態待ちのタイムアウト(秒)
    pub timeout_secs: u64,

    /// デバッグログを有効にするか
    pub debug: bool,
}

impl Vm6Config {
    /// 環境変数から設定を読み込む
    ///
    /// | 変数 | 意味 | デフォルト |
    /// |------|------|-----------|
    /// | `VM6_API_URL` | API ベース URL | 必須 |
    /// | `VM6_AUTH_URL` | 認証エンドポイント | `api_url` から導出 |
    /// | `VM6_EMAIL` / `VM6_PASSWORD` | 認証情報 | - |
    /// | `VM6_API_TOKEN` | 発行済みトークン | - |
    /// | `VM6_PARALLEL` | 同時実行数 | 4 |
    /// | `VM6_TLS_INSECURE` | 証明書検証の無効化 | true |
    /// | `VM6_TIMEOUT` | タイムアウト秒 | 300 |
    /// | `VM6_DEBUG` | デバッグログ | false |
    pub fn from_env() -> Result<Self> {
        let api_url = env_opt("VM6_API_URL")
            .ok_or_else(|| Vm6Error::MissingEnvVar("VM6_API_URL".to_string()))?;

        let max_parallel = match env_opt("VM6_PARALLEL") {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                Vm6Error::InvalidConfig(format!("VM6_PARALLEL must be a positive integer, got '{raw}'"))
            })?,
            None => DEFAULT_MAX_PARALLEL,
        };

        let tls_insecure = match env_opt("VM6_TLS_INSECURE") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                Vm6Error::InvalidConfig(format!("VM6_TLS_INSECURE must be a boolean, got '{raw}'"))
            })?,
            // 検証環境のセルフサイン証明書を想定したデフォルト
            None => true,
        };

        let timeout_secs = match env_opt("VM6_TIMEOUT") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                Vm6Error::InvalidConfig(format!("VM6_TIMEOUT must be a number of seconds, got '{raw}'"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        let debug = match env_opt("VM6_DEBUG") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                Vm6Error::InvalidConfig(format!("VM6_DEBUG must be a boolean, got '{raw}'"))
            })?,
            None => false,
        };

        let config = Self {
            api_url,
            auth_url: env_opt("VM6_AUTH_URL"),
            email: env_opt("VM6_EMAIL"),
            password: env_opt("VM6_PASSWORD"),
            api_token: env_opt("VM6_API_TOKEN"),
            max_parallel,
            tls_insecure,
            timeout_secs,
            debug,
        };
        config.validate()?;
        Ok(config)
    }

    /// 設定値の整合性チェック
    pub fn validate(&self) -> Result<()> {
        if self.max_parallel == 0 {
            return Err(Vm6Error::InvalidConfig(
                "VM6_PARALLEL must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Vm6Error::InvalidConfig(
                "VM6_TIMEOUT must be at least 1".to_string(),
            ));
        }
        let has_credentials = self.email.is_some() && self.password.is_some();
        if self.api_token.is_none() && !has_credentials {
            return Err(Vm6Error::InvalidConfig(
                "set VM6_API_TOKEN, or VM6_EMAIL and VM6_PASSWORD".to_string(),
            ));
        }
        Ok(())
    }

    /// 認証エンドポイントの URL
    ///
    /// 明示指定が無ければ API URL の `/vm/v3` 部分を `/auth/v4` へ
    /// 置き換えて導出する。
    pub fn auth_url(&self) -> String {
        if let Some(explicit) = &self.auth_url {
            return explicit.trim_end_matches('/').to_string();
        }
        let trimmed = self.api_url.trim_end_matches('/');
        match trimmed.strip_suffix("/vm/v3") {
            Some(base) => format!("{base}/auth/v4"),
            None => format!("{trimmed}/auth/v4"),
        }
    }

    /// プロビジョニングセッション用の設定へ変換する
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            max_parallel: self.max_parallel,
            initial_max_vmid: UNDISCOVERED,
        }
    }
}

/// 空文字列は未設定として扱う
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
