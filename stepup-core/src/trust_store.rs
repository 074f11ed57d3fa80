//! Persisted trusted-device grant storage.
//!
//! One slot, owned by this subsystem: the backend-issued device token
//! and its absolute expiry. A grant whose expiry has passed is treated
//! as absent and purged on the next read, so callers never observe a
//! stale grant twice. Malformed stored data also reads as absent —
//! the subsystem fails toward more verification, never toward trusting
//! an unrecognized state.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, StepUpError};

/// A capability that lets this device skip the step-up challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedDeviceGrant {
    /// Opaque credential issued by the backend for this device.
    pub token: String,
    /// Absolute expiry; past this instant the grant is void.
    pub expires_at: DateTime<Utc>,
    /// Fingerprint used when the grant was requested (display only).
    pub device_fingerprint: String,
}

impl TrustedDeviceGrant {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Swappable persistence seam for the trust grant.
///
/// Implementations own exactly one slot and must not touch unrelated
/// session state.
pub trait TrustStore: Send + Sync {
    /// Persist a grant, replacing any previous one.
    fn store(&self, grant: &TrustedDeviceGrant) -> Result<()>;

    /// Read the current grant. Returns `None` when nothing is stored,
    /// the stored data is malformed, or the grant has expired; the
    /// latter two purge the slot before returning.
    fn read(&self) -> Option<TrustedDeviceGrant>;

    /// Remove the grant. Clearing an empty slot is a no-op.
    fn clear(&self) -> Result<()>;
}

/// File-backed store: one JSON document at a fixed path.
pub struct FileTrustStore {
    path: PathBuf,
}

impl FileTrustStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn purge(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), error = %e, "Failed to purge trust grant");
            }
        }
    }
}

impl TrustStore for FileTrustStore {
    fn store(&self, grant: &TrustedDeviceGrant) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StepUpError::Storage(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
        }
        let json = serde_json::to_vec_pretty(grant)
            .map_err(|e| StepUpError::Storage(format!("Failed to serialize grant: {e}")))?;
        std::fs::write(&self.path, json)
            .map_err(|e| StepUpError::Storage(format!("Failed to write {}: {e}", self.path.display())))?;
        debug!(path = %self.path.display(), expires_at = %grant.expires_at, "Stored trust grant");
        Ok(())
    }

    fn read(&self) -> Option<TrustedDeviceGrant> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Trust grant unreadable, treating as absent");
                return None;
            }
        };

        let grant: TrustedDeviceGrant = match serde_json::from_slice(&bytes) {
            Ok(grant) => grant,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Malformed trust grant, purging");
                self.purge();
                return None;
            }
        };

        if grant.is_expired(Utc::now()) {
            debug!(expires_at = %grant.expires_at, "Trust grant expired, purging");
            self.purge();
            return None;
        }

        Some(grant)
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StepUpError::Storage(format!(
                "Failed to clear {}: {e}",
                self.path.display()
            ))),
        }
    }
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryTrustStore {
    slot: Mutex<Option<TrustedDeviceGrant>>,
}

impl MemoryTrustStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TrustStore for MemoryTrustStore {
    fn store(&self, grant: &TrustedDeviceGrant) -> Result<()> {
        *self.slot.lock().unwrap() = Some(grant.clone());
        Ok(())
    }

    fn read(&self) -> Option<TrustedDeviceGrant> {
        let mut slot = self.slot.lock().unwrap();
        match slot.as_ref() {
            Some(grant) if grant.is_expired(Utc::now()) => {
                *slot = None;
                None
            }
            Some(grant) => Some(grant.clone()),
            None => None,
        }
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}
