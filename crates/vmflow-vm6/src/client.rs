//! VMmanager 6 API クライアント
//!
//! `x-xsrf-token` ヘッダで認証する reqwest クライアント。作成・再構成・
//! 削除はサーバ側で非同期タスクとして処理されるため、目的の状態に
//! 達するまでポーリングで待つ手段も併せて提供する。

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use vmflow_core::{ProvisionError, VmIdSource};

use crate::config::{DEFAULT_TIMEOUT_SECS, Vm6Config};
use crate::error::{Result, Vm6Error};
use crate::types::{
    CreateHostRequest, ErrorEnvelope, HostList, ReconfigureHostRequest, TaskResponse,
    TokenRequest, TokenResponse, Vm6Host,
};

/// セッショントークンを渡すヘッダ名
const TOKEN_HEADER: &str = "x-xsrf-token";

/// 状態待ちのポーリング間隔
const POLL_INTERVAL: Duration = Duration::from_secs(3);

/// VMmanager 6 エンドポイントへの認証済みクライアント
pub struct Vm6Client {
    client: reqwest::Client,
    api_url: String,
    token: String,
    timeout_secs: u64,
}

impl Vm6Client {
    /// 設定から接続する
    ///
    /// 事前発行トークンがあればそのまま使い、無ければメールアドレスと
    /// パスワードで認証エンドポイントからトークンを取得する。
    pub async fn connect(config: &Vm6Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.tls_insecure)
            .build()?;

        let token = match &config.api_token {
            Some(token) => token.clone(),
            None => request_token(&client, config).await?,
        };

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
            timeout_secs: config.timeout_secs,
        })
    }

    /// 発行済みトークンからクライアントを作る (認証リクエストなし)
    pub fn with_token(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// ホストの一覧を取得する
    pub async fn list_hosts(&self) -> Result<Vec<Vm6Host>> {
        debug!("GET /host");
        let response = self
            .client
            .get(self.url("/host"))
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await?;
        let envelope: HostList = read_json(response).await?;
        Ok(envelope.list)
    }

    /// ID を指定してホストを 1 台取得する
    pub async fn get_host(&self, id: i64) -> Result<Vm6Host> {
        let response = self
            .client
            .get(self.url(&format!("/host/{id}")))
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await?;
        match read_json(response).await {
            Err(Vm6Error::Api { status: 404, .. }) => Err(Vm6Error::VmNotFound(id)),
            other => other,
        }
    }

    /// 名前でホストを探す (見つからなければ None)
    pub async fn find_host_by_name(&self, name: &str) -> Result<Option<Vm6Host>> {
        let hosts = self.list_hosts().await?;
        Ok(hosts.into_iter().find(|host| host.name == name))
    }

    /// 予約済み ID を添えてホストを作成する
    pub async fn create_host(&self, request: &CreateHostRequest) -> Result<TaskResponse> {
        info!(vm_id = request.id, name = %request.name, "creating host");
        let response = self
            .client
            .post(self.url("/host"))
            .header(TOKEN_HEADER, &self.token)
            .json(request)
            .send()
            .await?;
        read_json(response).await
    }

    /// 既存ホストのリソース割り当てを変更する
    pub async fn reconfigure_host(
        &self,
        id: i64,
        request: &ReconfigureHostRequest,
    ) -> Result<TaskResponse> {
        info!(vm_id = id, "reconfiguring host");
        let response = self
            .client
            .post(self.url(&format!("/host/{id}")))
            .header(TOKEN_HEADER, &self.token)
            .json(request)
            .send()
            .await?;
        match read_json(response).await {
            Err(Vm6Error::Api { status: 404, .. }) => Err(Vm6Error::VmNotFound(id)),
            other => other,
        }
    }

    /// ホストを削除する
    pub async fn delete_host(&self, id: i64) -> Result<TaskResponse> {
        info!(vm_id = id, "deleting host");
        let response = self
            .client
            .delete(self.url(&format!("/host/{id}")))
            .header(TOKEN_HEADER, &self.token)
            .send()
            .await?;
        match read_json(response).await {
            Err(Vm6Error::Api { status: 404, .. }) => Err(Vm6Error::VmNotFound(id)),
            other => other,
        }
    }

    /// ホストが目的の状態になるまで待つ
    pub async fn wait_host_state(&self, id: i64, want: &str) -> Result<Vm6Host> {
        let deadline = Instant::now() + Duration::from_secs(self.timeout_secs);
        loop {
            match self.get_host(id).await {
                Ok(host) if host.state == want => return Ok(host),
                Ok(host) => {
                    debug!(vm_id = id, state = %host.state, want, "waiting for host state");
                }
                // 作成直後は一覧への反映に間があるので 404 は待ちに含める
                Err(Vm6Error::VmNotFound(_)) => {
                    debug!(vm_id = id, want, "host not visible yet");
                }
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                return Err(Vm6Error::Timeout {
                    resource: format!("host {id} to reach '{want}'"),
                    secs: self.timeout_secs,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// ホストが消えるまで待つ
    pub async fn wait_host_removed(&self, id: i64) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(self.timeout_secs);
        loop {
            match self.get_host(id).await {
                Err(Vm6Error::VmNotFound(_)) => return Ok(()),
                Ok(host) => {
                    debug!(vm_id = id, state = %host.state, "waiting for host removal");
                }
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                return Err(Vm6Error::Timeout {
                    resource: format!("host {id} removal"),
                    secs: self.timeout_secs,
                });
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}

/// 使用中 ID の最大値を報告してアロケータの初回発見に答える。
/// ホストが 1 台も無ければ 0 (次の払い出しは 1 になる)。
#[async_trait]
impl VmIdSource for Vm6Client {
    async fn max_in_use_id(&self) -> vmflow_core::Result<i64> {
        let hosts = self
            .list_hosts()
            .await
            .map_err(|e| ProvisionError::Discovery(e.to_string()))?;
        Ok(highest_id(&hosts))
    }
}

fn highest_id(hosts: &[Vm6Host]) -> i64 {
    hosts.iter().map(|host| host.id).max().unwrap_or(0)
}

/// メールアドレスとパスワードでトークンを発行する
async fn request_token(client: &reqwest::Client, config: &Vm6Config) -> Result<String> {
    let (Some(email), Some(password)) = (&config.email, &config.password) else {
        return Err(Vm6Error::InvalidConfig(
            "set VM6_API_TOKEN, or VM6_EMAIL and VM6_PASSWORD".to_string(),
        ));
    };

    let url = format!("{}/public/token", config.auth_url());
    debug!(%url, "requesting API token");
    let response = client
        .post(&url)
        .json(&TokenRequest {
            email: email.clone(),
            password: password.clone(),
        })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Vm6Error::AuthenticationFailed(extract_api_message(
            status, &body,
        )));
    }

    let token: TokenResponse = response.json().await?;
    debug!("authenticated against the VMmanager API");
    Ok(token.token)
}

/// レスポンスを JSON として読み、失敗ステータスは API エラーへ写す
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Vm6Error::Api {
            status: status.as_u16(),
            message: extract_api_message(status, &body),
        });
    }
    Ok(response.json().await?)
}

/// エラー封筒から `msg` を取り出す。封筒でなければ本文をそのまま使う
fn extract_api_message(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.error.msg.is_empty() => envelope.error.msg,
        _ if body.trim().is_empty() => status.to_string(),
        _ => body.trim().to_string(),
    }
}
