//! Trusted-device administration.
//!
//! A thin stateful panel over the backend's device listing. Revoking a
//! row that was used within the last few minutes is taken to mean "this
//! device": no reliable client-side identity comparison exists, so the
//! panel clears the local trust grant and cached session token on that
//! recency heuristic, forcing a re-challenge on the next sensitive
//! action.

use chrono::{Duration, Utc};
use tracing::{debug, info, instrument, warn};

use crate::api::{TrustedDeviceRecord, TwoFactorBackend};
use crate::error::{Result, StepUpError};
use crate::session::{clear_local_auth, SessionTokens};
use crate::trust_store::TrustStore;

/// A device used this recently is presumed to be the current one.
pub const CURRENT_DEVICE_WINDOW_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevokeOutcome {
    /// True when the revoked row looked like the current device and
    /// the local trust state was cleared along with it.
    pub cleared_local_trust: bool,
}

#[derive(Default)]
pub struct DevicePanel {
    records: Vec<TrustedDeviceRecord>,
}

impl DevicePanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[TrustedDeviceRecord] {
        &self.records
    }

    /// Fetch the identity's active grants. An empty list is a valid
    /// result, not an error. A 401 voids the local trust state before
    /// the error propagates.
    #[instrument(level = "debug", skip_all)]
    pub async fn refresh(
        &mut self,
        backend: &dyn TwoFactorBackend,
        store: &dyn TrustStore,
        session: &mut SessionTokens,
    ) -> Result<&[TrustedDeviceRecord]> {
        self.records = backend
            .list_devices()
            .await
            .map_err(|e| void_trust_on_unauthorized(e, store, session))?;
        debug!(count = self.records.len(), "Refreshed trusted-device list");
        Ok(&self.records)
    }

    /// Revoke one grant. On success exactly that row disappears from
    /// the list; a failed revoke leaves the list untouched.
    #[instrument(level = "debug", skip_all, fields(device_id))]
    pub async fn revoke(
        &mut self,
        backend: &dyn TwoFactorBackend,
        store: &dyn TrustStore,
        session: &mut SessionTokens,
        device_id: &str,
    ) -> Result<RevokeOutcome> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == device_id)
            .ok_or_else(|| StepUpError::Api(format!("Unknown device: {device_id}")))?;

        backend
            .revoke_device(device_id)
            .await
            .map_err(|e| void_trust_on_unauthorized(e, store, session))?;

        let record = self.records.remove(index);
        let looks_current =
            Utc::now() - record.last_used_at <= Duration::minutes(CURRENT_DEVICE_WINDOW_MINUTES);

        if looks_current {
            info!(device_id, "Revoked device looks like the current one, clearing local trust");
            clear_local_auth(session, store)?;
        }

        Ok(RevokeOutcome {
            cleared_local_trust: looks_current,
        })
    }
}

/// On a 401 the primary credential was rejected: the trust grant and
/// the cached session token are cleared together before the error is
/// handed back.
fn void_trust_on_unauthorized(
    err: StepUpError,
    store: &dyn TrustStore,
    session: &mut SessionTokens,
) -> StepUpError {
    if matches!(err, StepUpError::Unauthorized) {
        info!("Primary credential rejected, clearing local trust state");
        if let Err(e) = clear_local_auth(session, store) {
            warn!(error = %e, "Failed to clear local trust state after 401");
        }
    }
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockBackend;
    use crate::trust_store::{MemoryTrustStore, TrustedDeviceGrant};

    fn record(id: &str, last_used_minutes_ago: i64) -> TrustedDeviceRecord {
        let now = Utc::now();
        TrustedDeviceRecord {
            id: id.to_string(),
            device_name: Some(format!("device {id}")),
            ip_address: Some("203.0.113.9".to_string()),
            created_at: now - Duration::days(30),
            last_used_at: now - Duration::minutes(last_used_minutes_ago),
            expires_at: now + Duration::days(30),
            is_active: true,
        }
    }

    fn seeded_store() -> MemoryTrustStore {
        let store = MemoryTrustStore::new();
        store
            .store(&TrustedDeviceGrant {
                token: "trust".to_string(),
                expires_at: Utc::now() + Duration::days(7),
                device_fingerprint: "fp".to_string(),
            })
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_refresh_accepts_empty_list() {
        let backend = MockBackend::new().with_devices(Ok(vec![]));
        let store = MemoryTrustStore::new();
        let mut session = SessionTokens::new("primary");
        let mut panel = DevicePanel::new();
        let records = panel.refresh(&backend, &store, &mut session).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_refresh_clears_local_trust() {
        let backend = MockBackend::new().with_devices(Err(StepUpError::Unauthorized));
        let store = seeded_store();
        let mut session = SessionTokens::new("primary");
        session.set_backend_session("secondary");

        let mut panel = DevicePanel::new();
        let err = panel
            .refresh(&backend, &store, &mut session)
            .await
            .unwrap_err();

        assert!(matches!(err, StepUpError::Unauthorized));
        assert!(store.read().is_none(), "grant must not survive a 401");
        assert_eq!(session.backend_session(), None);
    }

    #[tokio::test]
    async fn test_unauthorized_revoke_clears_local_trust() {
        let backend = MockBackend::new()
            .with_devices(Ok(vec![record("a", 60)]))
            .with_revoke(Err(StepUpError::Unauthorized));
        let store = seeded_store();
        let mut session = SessionTokens::new("primary");
        session.set_backend_session("secondary");

        let mut panel = DevicePanel::new();
        panel.refresh(&backend, &store, &mut session).await.unwrap();

        let err = panel
            .revoke(&backend, &store, &mut session, "a")
            .await
            .unwrap_err();

        assert!(matches!(err, StepUpError::Unauthorized));
        assert!(store.read().is_none(), "grant must not survive a 401");
        assert_eq!(session.backend_session(), None);
        assert_eq!(panel.records().len(), 1, "row stays until revoke succeeds");
    }

    #[tokio::test]
    async fn test_revoke_removes_exactly_that_record() {
        let backend = MockBackend::new()
            .with_devices(Ok(vec![record("a", 60), record("b", 120)]))
            .with_revoke(Ok(()));
        let store = seeded_store();
        let mut session = SessionTokens::new("primary");

        let mut panel = DevicePanel::new();
        panel.refresh(&backend, &store, &mut session).await.unwrap();

        let outcome = panel
            .revoke(&backend, &store, &mut session, "a")
            .await
            .unwrap();

        assert!(!outcome.cleared_local_trust, "stale device is not current");
        let ids: Vec<&str> = panel.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
        assert!(store.read().is_some(), "local trust untouched");
    }

    #[tokio::test]
    async fn test_revoking_recently_used_device_clears_local_trust() {
        let backend = MockBackend::new()
            .with_devices(Ok(vec![record("a", 1)]))
            .with_revoke(Ok(()));
        let store = seeded_store();
        let mut session = SessionTokens::new("primary");
        session.set_backend_session("secondary");

        let mut panel = DevicePanel::new();
        panel.refresh(&backend, &store, &mut session).await.unwrap();

        let outcome = panel
            .revoke(&backend, &store, &mut session, "a")
            .await
            .unwrap();

        assert!(outcome.cleared_local_trust);
        assert!(store.read().is_none());
        assert_eq!(session.backend_session(), None);
    }

    #[tokio::test]
    async fn test_failed_revoke_leaves_list_unchanged() {
        let backend = MockBackend::new()
            .with_devices(Ok(vec![record("a", 1)]))
            .with_revoke(Err(StepUpError::Rejected {
                detail: "Device not found".to_string(),
            }));
        let store = seeded_store();
        let mut session = SessionTokens::new("primary");

        let mut panel = DevicePanel::new();
        panel.refresh(&backend, &store, &mut session).await.unwrap();

        let err = panel
            .revoke(&backend, &store, &mut session, "a")
            .await
            .unwrap_err();
        assert!(matches!(err, StepUpError::Rejected { .. }));
        assert_eq!(panel.records().len(), 1, "no partial removal");
        assert!(store.read().is_some());
    }

    #[tokio::test]
    async fn test_revoking_unknown_device_is_an_error() {
        let backend = MockBackend::new().with_devices(Ok(vec![record("a", 1)]));
        let store = seeded_store();
        let mut session = SessionTokens::new("primary");

        let mut panel = DevicePanel::new();
        panel.refresh(&backend, &store, &mut session).await.unwrap();

        let err = panel
            .revoke(&backend, &store, &mut session, "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, StepUpError::Api(_)));
        assert_eq!(backend.revoke_calls(), 0, "no backend call for unknown rows");
    }
}
