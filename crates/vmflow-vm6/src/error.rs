//! VMmanager プロバイダのエラー型

use thiserror::Error;

/// Errors raised while talking to a VMmanager 6 endpoint
#[derive(Error, Debug)]
pub enum Vm6Error {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("VM not found: {0}")]
    VmNotFound(i64),

    #[error("Timed out after {secs}s waiting for {resource}")]
    Timeout { resource: String, secs: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Provisioning error: {0}")]
    Core(#[from] vmflow_core::ProvisionError),
}

pub type Result<T> = std::result::Result<T, Vm6Error>;
