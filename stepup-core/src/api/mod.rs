//! Backend contract for the step-up endpoints.
//!
//! The backend that issues and validates codes is a black box with a
//! fixed HTTP contract. This module defines that contract as an async
//! trait plus its wire types, so the challenge machine and the device
//! panel can be driven against the real [`HttpBackend`] or the
//! scripted [`MockBackend`] interchangeably.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, StepUpError};

mod http;
mod mock;

pub use http::HttpBackend;
pub use mock::MockBackend;

/// Response to `POST /auth/2fa/send-code`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendCodeResponse {
    pub requires_2fa: bool,
    pub code_sent: bool,
    /// True when the backend recognized this device's trust token;
    /// no code was sent and the challenge is already satisfied.
    pub trusted_device: bool,
    #[serde(default)]
    pub expires_in_minutes: Option<u32>,
}

/// Body of `POST /auth/2fa/verify-code`.
#[derive(Debug, Clone, Serialize)]
pub struct VerifyCodeRequest {
    pub user_id: String,
    pub code: String,
    pub device_fingerprint: String,
    pub remember_device: bool,
}

/// Response to `POST /auth/2fa/verify-code`.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyCodeResponse {
    pub success: bool,
    #[serde(default)]
    pub device_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub backend_session_token: Option<String>,
}

/// One row of `GET /auth/2fa/trusted-devices`. A read projection owned
/// by the backend; the client only ever requests its deletion.
#[derive(Debug, Clone, Deserialize)]
pub struct TrustedDeviceRecord {
    pub id: String,
    #[serde(default)]
    pub device_name: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Error body carried by non-2xx responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorDetail {
    pub detail: String,
}

/// The step-up endpoints, bearer-authenticated with the primary
/// identity token.
#[async_trait]
pub trait TwoFactorBackend: Send + Sync {
    /// Ask the backend to dispatch a one-time code, or to recognize
    /// this device's trust token.
    async fn send_code(&self, device_token: Option<&str>) -> Result<SendCodeResponse>;

    /// Submit a candidate code. Never retried: the code is single-use.
    async fn verify_code(&self, request: &VerifyCodeRequest) -> Result<VerifyCodeResponse>;

    /// List the identity's trusted-device grants.
    async fn list_devices(&self) -> Result<Vec<TrustedDeviceRecord>>;

    /// Request deletion of one grant.
    async fn revoke_device(&self, device_id: &str) -> Result<()>;
}

/// Connection settings for the real backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL, e.g. `https://api.example.org`.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Maximum retry attempts for idempotent reads.
    pub max_retries: u32,
}

impl BackendConfig {
    /// Environment variable naming the backend base URL.
    pub const API_URL_VAR: &'static str = "STEPUP_API_URL";

    /// Create configuration from the environment.
    ///
    /// Required: `STEPUP_API_URL`. A missing or unparsable URL is a
    /// configuration error, fatal to the subsystem.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var(Self::API_URL_VAR).map_err(|_| {
            StepUpError::Config(format!("{} environment variable not set", Self::API_URL_VAR))
        })?;
        Self::new(base_url)
    }

    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        url::Url::parse(&base_url)
            .map_err(|e| StepUpError::Config(format!("Invalid backend URL: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_rejects_garbage_url() {
        assert!(matches!(
            BackendConfig::new("not a url"),
            Err(StepUpError::Config(_))
        ));
    }

    #[test]
    fn test_config_strips_trailing_slash() {
        let config = BackendConfig::new("https://api.example.org/").unwrap();
        assert_eq!(config.base_url, "https://api.example.org");
    }

    #[test]
    fn test_send_code_response_tolerates_missing_expiry() {
        let json = r#"{"requires_2fa":true,"code_sent":true,"trusted_device":false}"#;
        let parsed: SendCodeResponse = serde_json::from_str(json).unwrap();
        assert!(parsed.code_sent);
        assert_eq!(parsed.expires_in_minutes, None);
    }

    #[test]
    fn test_device_record_parses_contract_shape() {
        let json = r#"{
            "id": "dev-1",
            "device_name": "Work laptop",
            "ip_address": "203.0.113.9",
            "created_at": "2026-08-01T10:00:00Z",
            "last_used_at": "2026-08-29T09:30:00Z",
            "expires_at": "2026-09-01T10:00:00Z",
            "is_active": true
        }"#;
        let record: TrustedDeviceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, "dev-1");
        assert_eq!(record.device_name.as_deref(), Some("Work laptop"));
        assert!(record.is_active);
    }
}
