//! VMmanager 6 API のワイヤ型
//!
//! レスポンスは API が返す余分なフィールドを無視できるよう、必要な
//! フィールドだけを受け取る。一覧系は `{"list": [...]}` 封筒で届く。

use serde::{Deserialize, Serialize};

/// `POST {auth}/public/token` リクエスト
#[derive(Debug, Serialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

/// トークン発行レスポンス
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(default)]
    pub id: Option<i64>,
}

/// `GET /host` の一覧封筒
#[derive(Debug, Deserialize)]
pub struct HostList {
    #[serde(default)]
    pub list: Vec<Vm6Host>,
}

/// API が報告する仮想マシン 1 台分
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Vm6Host {
    pub id: i64,
    pub name: String,
    /// ライフサイクル状態 (`active`, `creating`, `stopped` など)
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub ip4: Option<String>,
    #[serde(default)]
    pub cpu_number: Option<u32>,
    #[serde(default)]
    pub ram_mib: Option<u64>,
    #[serde(default)]
    pub disk_gib: Option<u64>,
    #[serde(default)]
    pub note: Option<String>,
}

/// `POST /host` リクエスト
///
/// `id` はアロケータが予約済みの VM ID。サーバ側の自動採番には
/// 頼らない。
#[derive(Debug, Serialize)]
pub struct CreateHostRequest {
    pub id: i64,
    pub name: String,
    pub os: String,
    pub cpu_number: u32,
    pub ram_mib: u64,
    pub disk_gib: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// `POST /host/{id}` による再構成リクエスト
#[derive(Debug, Serialize)]
pub struct ReconfigureHostRequest {
    pub cpu_number: u32,
    pub ram_mib: u64,
    pub disk_gib: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// 非同期操作の受付レスポンス
#[derive(Debug, Deserialize)]
pub struct TaskResponse {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub task: Option<i64>,
}

/// エラーレスポンスの封筒 `{"error": {"code": ..., "msg": ...}}`
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_list_parses_the_envelope() {
        let raw = r#"{
            "list": [
                {
                    "id": 108,
                    "name": "web-01",
                    "state": "active",
                    "ip4": "203.0.113.10",
                    "cpu_number": 2,
                    "ram_mib": 2048,
                    "disk_gib": 20,
                    "cluster": {"id": 1, "name": "default"},
                    "node": 3
                },
                {"id": 109, "name": "db-01"}
            ]
        }"#;

        let parsed: HostList = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.list.len(), 2);
        assert_eq!(parsed.list[0].id, 108);
        assert_eq!(parsed.list[0].cpu_number, Some(2));
        // 欠けたフィールドはデフォルトで埋まる
        assert_eq!(parsed.list[1].state, "");
        assert_eq!(parsed.list[1].ram_mib, None);
    }

    #[test]
    fn test_empty_list_envelope() {
        let parsed: HostList = serde_json::from_str(r#"{"list": []}"#).unwrap();
        assert!(parsed.list.is_empty());

        let missing: HostList = serde_json::from_str("{}").unwrap();
        assert!(missing.list.is_empty());
    }

    #[test]
    fn test_create_request_carries_the_reserved_id() {
        let request = CreateHostRequest {
            id: 110,
            name: "web-02".to_string(),
            os: "ubuntu-24.04".to_string(),
            cpu_number: 2,
            ram_mib: 2048,
            disk_gib: 20,
            note: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["id"], 110);
        assert_eq!(value["name"], "web-02");
        assert_eq!(value["os"], "ubuntu-24.04");
        // None の note はフィールドごと省略される
        assert!(value.get("note").is_none());
    }

    #[test]
    fn test_error_envelope_parses() {
        let raw = r#"{"error": {"code": 2002, "msg": "host with this name already exists"}}"#;
        let parsed: ErrorEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.error.code, Some(2002));
        assert_eq!(parsed.error.msg, "host with this name already exists");
    }

    #[test]
    fn test_token_response_tolerates_extra_fields() {
        let raw = r#"{"token": "4-e9726dd9-61d9-2940-add3", "id": 7, "expires_at": "2026-01-01"}"#;
        let parsed: TokenResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.token, "4-e9726dd9-61d9-2940-add3");
        assert_eq!(parsed.id, Some(7));
    }
}
