//! Scripted mock backend for testing.
//!
//! Responses are queued up front and replayed in order; a call with
//! nothing scripted for its endpoint fails.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    SendCodeResponse, TrustedDeviceRecord, TwoFactorBackend, VerifyCodeRequest, VerifyCodeResponse,
};
use crate::error::{Result, StepUpError};

#[derive(Default)]
struct Script {
    send: VecDeque<Result<SendCodeResponse>>,
    verify: VecDeque<Result<VerifyCodeResponse>>,
    devices: VecDeque<Result<Vec<TrustedDeviceRecord>>>,
    revoke: VecDeque<Result<()>>,
}

#[derive(Default)]
struct Counters {
    send: u32,
    verify: u32,
    list: u32,
    revoke: u32,
}

/// Backend double that replays queued responses and counts calls.
#[derive(Default)]
pub struct MockBackend {
    script: Mutex<Script>,
    counters: Mutex<Counters>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience: a send-code response that dispatched a code.
    pub fn code_sent(expires_in_minutes: Option<u32>) -> SendCodeResponse {
        SendCodeResponse {
            requires_2fa: true,
            code_sent: true,
            trusted_device: false,
            expires_in_minutes,
        }
    }

    /// Convenience: a send-code response that recognized the device.
    pub fn device_trusted() -> SendCodeResponse {
        SendCodeResponse {
            requires_2fa: true,
            code_sent: false,
            trusted_device: true,
            expires_in_minutes: None,
        }
    }

    pub fn with_send(self, response: Result<SendCodeResponse>) -> Self {
        self.script.lock().unwrap().send.push_back(response);
        self
    }

    pub fn with_verify(self, response: Result<VerifyCodeResponse>) -> Self {
        self.script.lock().unwrap().verify.push_back(response);
        self
    }

    pub fn with_devices(self, response: Result<Vec<TrustedDeviceRecord>>) -> Self {
        self.script.lock().unwrap().devices.push_back(response);
        self
    }

    pub fn with_revoke(self, response: Result<()>) -> Self {
        self.script.lock().unwrap().revoke.push_back(response);
        self
    }

    pub fn send_calls(&self) -> u32 {
        self.counters.lock().unwrap().send
    }

    pub fn verify_calls(&self) -> u32 {
        self.counters.lock().unwrap().verify
    }

    pub fn list_calls(&self) -> u32 {
        self.counters.lock().unwrap().list
    }

    pub fn revoke_calls(&self) -> u32 {
        self.counters.lock().unwrap().revoke
    }

    fn unscripted(endpoint: &str) -> StepUpError {
        StepUpError::Api(format!("MockBackend: no scripted response for {endpoint}"))
    }
}

#[async_trait]
impl TwoFactorBackend for MockBackend {
    async fn send_code(&self, _device_token: Option<&str>) -> Result<SendCodeResponse> {
        self.counters.lock().unwrap().send += 1;
        self.script
            .lock()
            .unwrap()
            .send
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted("send-code")))
    }

    async fn verify_code(&self, _request: &VerifyCodeRequest) -> Result<VerifyCodeResponse> {
        self.counters.lock().unwrap().verify += 1;
        self.script
            .lock()
            .unwrap()
            .verify
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted("verify-code")))
    }

    async fn list_devices(&self) -> Result<Vec<TrustedDeviceRecord>> {
        self.counters.lock().unwrap().list += 1;
        self.script
            .lock()
            .unwrap()
            .devices
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted("trusted-devices")))
    }

    async fn revoke_device(&self, _device_id: &str) -> Result<()> {
        self.counters.lock().unwrap().revoke += 1;
        self.script
            .lock()
            .unwrap()
            .revoke
            .pop_front()
            .unwrap_or_else(|| Err(Self::unscripted("revoke")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let backend = MockBackend::new()
            .with_send(Ok(MockBackend::device_trusted()))
            .with_send(Ok(MockBackend::code_sent(Some(10))));

        let first = backend.send_code(None).await.unwrap();
        assert!(first.trusted_device);

        let second = backend.send_code(None).await.unwrap();
        assert!(second.code_sent);
        assert_eq!(backend.send_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_unscripted_call_errors() {
        let backend = MockBackend::new();
        let err = backend.revoke_device("dev-1").await.unwrap_err();
        assert!(matches!(err, StepUpError::Api(_)));
    }
}
