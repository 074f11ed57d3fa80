//! HTTP implementation of the step-up backend contract.
//!
//! Transient failures (timeouts, connection errors, 5xx, 429) on the
//! idempotent device listing are retried with exponential backoff.
//! `send-code` and `verify-code` are never retried automatically:
//! re-firing either could dispatch a duplicate code or race a
//! single-use one.

use backoff::{future::retry_notify, ExponentialBackoff};
use reqwest::{Client, Response, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use zeroize::Zeroizing;

use super::{
    BackendConfig, ErrorDetail, SendCodeResponse, TrustedDeviceRecord, TwoFactorBackend,
    VerifyCodeRequest, VerifyCodeResponse,
};
use crate::error::{Result, StepUpError};

pub struct HttpBackend {
    client: Client,
    config: BackendConfig,
    primary_token: Zeroizing<String>,
}

impl HttpBackend {
    /// Create a client authorized with the primary identity token.
    pub fn new(config: BackendConfig, primary_token: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StepUpError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            primary_token: Zeroizing::new(primary_token.into()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn build_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
            max_elapsed_time: Some(self.config.timeout * self.config.max_retries),
            ..Default::default()
        }
    }

    /// Map a non-2xx response to an error, passing the backend's
    /// `detail` through verbatim where present.
    async fn rejection(response: Response) -> StepUpError {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return StepUpError::Unauthorized;
        }
        match response.json::<ErrorDetail>().await {
            Ok(body) => StepUpError::Rejected { detail: body.detail },
            Err(_) => StepUpError::Api(format!("Backend returned status {status}")),
        }
    }

    async fn list_devices_once(
        &self,
    ) -> std::result::Result<Vec<TrustedDeviceRecord>, backoff::Error<StepUpError>> {
        let response = self
            .client
            .get(self.url("/auth/2fa/trusted-devices"))
            .bearer_auth(self.primary_token.as_str())
            .send()
            .await
            .map_err(|e| {
                if is_transient_error(&e) {
                    warn!(error = %e, "Transient error listing devices, will retry");
                    backoff::Error::transient(StepUpError::Http(e))
                } else {
                    backoff::Error::permanent(StepUpError::Http(e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let err = Self::rejection(response).await;
            return if is_transient_status(status) {
                Err(backoff::Error::transient(err))
            } else {
                Err(backoff::Error::permanent(err))
            };
        }

        response
            .json::<Vec<TrustedDeviceRecord>>()
            .await
            .map_err(|e| {
                backoff::Error::permanent(StepUpError::Api(format!(
                    "Failed to parse device list: {e}"
                )))
            })
    }
}

#[async_trait::async_trait]
impl TwoFactorBackend for HttpBackend {
    #[instrument(level = "debug", skip_all, fields(has_device_token = device_token.is_some()))]
    async fn send_code(&self, device_token: Option<&str>) -> Result<SendCodeResponse> {
        let body = json!({ "device_token": device_token });

        let response = self
            .client
            .post(self.url("/auth/2fa/send-code"))
            .bearer_auth(self.primary_token.as_str())
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        let parsed: SendCodeResponse = response
            .json()
            .await
            .map_err(|e| StepUpError::Api(format!("Failed to parse send-code response: {e}")))?;

        debug!(
            code_sent = parsed.code_sent,
            trusted_device = parsed.trusted_device,
            "send-code completed"
        );
        Ok(parsed)
    }

    #[instrument(level = "debug", skip_all, fields(user_id = %request.user_id))]
    async fn verify_code(&self, request: &VerifyCodeRequest) -> Result<VerifyCodeResponse> {
        let response = self
            .client
            .post(self.url("/auth/2fa/verify-code"))
            .bearer_auth(self.primary_token.as_str())
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| StepUpError::Api(format!("Failed to parse verify-code response: {e}")))
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_devices(&self) -> Result<Vec<TrustedDeviceRecord>> {
        retry_notify(
            self.build_backoff(),
            || async { self.list_devices_once().await },
            |err: StepUpError, duration: Duration| {
                warn!(
                    error = %err,
                    retry_after_ms = duration.as_millis() as u64,
                    "Retry scheduled"
                );
            },
        )
        .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn revoke_device(&self, device_id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.url(&format!("/auth/2fa/trusted-devices/{device_id}")))
            .bearer_auth(self.primary_token.as_str())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejection(response).await);
        }
        debug!(device_id, "Device revoked");
        Ok(())
    }
}

/// Connection-level failures that are worth retrying.
fn is_transient_error(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect()
}

/// HTTP statuses that indicate a transient server-side condition.
fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_status_classification() {
        assert!(is_transient_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_transient_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(is_transient_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_transient_status(StatusCode::BAD_REQUEST));
        assert!(!is_transient_status(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_url_joins_paths() {
        let config = BackendConfig::new("https://api.example.org").unwrap();
        let backend = HttpBackend::new(config, "token").unwrap();
        assert_eq!(
            backend.url("/auth/2fa/send-code"),
            "https://api.example.org/auth/2fa/send-code"
        );
    }
}
