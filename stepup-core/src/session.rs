//! Token pair held by the hosting application.
//!
//! The primary identity token authorizes the step-up endpoints
//! themselves; the backend session token is issued only once the
//! challenge succeeds and authorizes the rest of the application.
//! A stale session token must never outlive the primary credential,
//! so logout and any 401 clear it together with the trust grant.

use zeroize::Zeroizing;

use crate::error::Result;
use crate::trust_store::TrustStore;

pub struct SessionTokens {
    primary: Zeroizing<String>,
    backend_session: Option<Zeroizing<String>>,
}

impl SessionTokens {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: Zeroizing::new(primary.into()),
            backend_session: None,
        }
    }

    pub fn primary(&self) -> &str {
        &self.primary
    }

    pub fn backend_session(&self) -> Option<&str> {
        self.backend_session.as_deref().map(String::as_str)
    }

    pub fn set_backend_session(&mut self, token: impl Into<String>) {
        self.backend_session = Some(Zeroizing::new(token.into()));
    }

    pub fn clear_backend_session(&mut self) {
        self.backend_session = None;
    }
}

/// Drop everything that authorizes this device without a challenge:
/// the cached backend session token and the persisted trust grant.
/// Called on logout and on a 401 from any backend call.
pub fn clear_local_auth(session: &mut SessionTokens, store: &dyn TrustStore) -> Result<()> {
    session.clear_backend_session();
    store.clear()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trust_store::{MemoryTrustStore, TrustedDeviceGrant};
    use chrono::{Duration, Utc};

    #[test]
    fn test_backend_session_lifecycle() {
        let mut tokens = SessionTokens::new("primary");
        assert_eq!(tokens.backend_session(), None);

        tokens.set_backend_session("secondary");
        assert_eq!(tokens.backend_session(), Some("secondary"));
        assert_eq!(tokens.primary(), "primary");

        tokens.clear_backend_session();
        assert_eq!(tokens.backend_session(), None);
    }

    #[test]
    fn test_clear_local_auth_clears_both() {
        let store = MemoryTrustStore::new();
        store
            .store(&TrustedDeviceGrant {
                token: "t".to_string(),
                expires_at: Utc::now() + Duration::days(1),
                device_fingerprint: "fp".to_string(),
            })
            .unwrap();

        let mut tokens = SessionTokens::new("primary");
        tokens.set_backend_session("secondary");

        clear_local_auth(&mut tokens, &store).unwrap();
        assert_eq!(tokens.backend_session(), None);
        assert!(store.read().is_none());
    }
}
