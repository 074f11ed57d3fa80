//! Step-Up Core - Two-factor verification and device-trust client library
//!
//! This crate implements the step-up (2FA) subsystem of an
//! administrative client: it challenges a freshly authenticated
//! identity with a time-boxed one-time code, throttles resends, and
//! maintains a persisted, expiring trusted-device grant so recognized
//! devices can skip the challenge.
//!
//! # Components
//!
//! - [`Challenge`] - the one-time-code state machine
//! - [`TrustStore`] - persisted trusted-device grant (file or memory)
//! - [`generate_fingerprint`] - best-effort device fingerprint
//! - [`DevicePanel`] - list and revoke trusted-device grants
//! - [`TwoFactorBackend`] - the backend contract, as [`HttpBackend`]
//!   or the scripted [`MockBackend`]
//!
//! # Example
//!
//! ```no_run
//! use stepup_core::{
//!     generate_fingerprint, Challenge, EntryEffect, MemoryTrustStore, MockBackend,
//!     VerifyOutcome,
//! };
//!
//! # async fn example() -> stepup_core::Result<()> {
//! // Use the scripted mock for testing (in production, use HttpBackend)
//! let backend = MockBackend::new().with_send(Ok(MockBackend::code_sent(Some(10))));
//! let store = MemoryTrustStore::new();
//!
//! let mut challenge = Challenge::new("user-1", generate_fingerprint());
//! challenge.initiate(&backend, &store).await?;
//!
//! // The hosting layer feeds digits in; pasting a 6-digit block submits.
//! if challenge.paste_digits("482913") == EntryEffect::Submit {
//!     if let VerifyOutcome::Verified(session) =
//!         challenge.verify(&backend, &store, true).await?
//!     {
//!         let _ = session.backend_session_token;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod challenge;
pub mod devices;
pub mod error;
pub mod fingerprint;
pub mod session;
pub mod trust_store;

// Re-export main types for convenience
pub use api::{
    BackendConfig, HttpBackend, MockBackend, SendCodeResponse, TrustedDeviceRecord,
    TwoFactorBackend, VerifyCodeRequest, VerifyCodeResponse,
};
pub use challenge::{
    Challenge, ChallengeStatus, EntryEffect, InitiateOutcome, ResendOutcome, VerifiedSession,
    VerifyOutcome, CODE_LEN, RESEND_COOLDOWN_SECS,
};
pub use devices::{DevicePanel, RevokeOutcome, CURRENT_DEVICE_WINDOW_MINUTES};
pub use error::{Result, StepUpError};
pub use fingerprint::generate_fingerprint;
pub use session::{clear_local_auth, SessionTokens};
pub use trust_store::{FileTrustStore, MemoryTrustStore, TrustStore, TrustedDeviceGrant};
