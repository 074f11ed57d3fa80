//! One-time-code challenge state machine.
//!
//! A [`Challenge`] is an explicit state object plus a small set of
//! transition functions. The hosting layer (a UI, or the CLI's event
//! loop) owns the timers and the rendering; it feeds digits, paste
//! events and timer ticks into the machine, and performs the network
//! transitions `initiate`, `verify` and `resend` against a
//! [`TwoFactorBackend`].
//!
//! States: `idle → sending → awaiting_entry → verifying → {verified |
//! awaiting_entry}`. `verified` is terminal; a new challenge gets a
//! fresh instance.

use tracing::{debug, info, instrument, warn};

use crate::api::{TwoFactorBackend, VerifyCodeRequest};
use crate::error::{Result, StepUpError};
use crate::trust_store::{TrustStore, TrustedDeviceGrant};

/// Number of code digit slots.
pub const CODE_LEN: usize = 6;

/// Seconds a user must wait between resend requests.
pub const RESEND_COOLDOWN_SECS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeStatus {
    Idle,
    Sending,
    AwaitingEntry,
    Verifying,
    Verified,
    Failed,
}

/// What the hosting layer should do after a digit or paste event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryEffect {
    /// Nothing changed; the input was ignored.
    None,
    /// Move input focus to the given slot.
    FocusSlot(usize),
    /// All six digits are present: call [`Challenge::verify`] now.
    Submit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitiateOutcome {
    /// The backend recognized this device's trust token, or decided no
    /// second factor is required. No code was exchanged.
    Satisfied { trusted_device: bool },
    /// A code was dispatched; the machine now awaits entry.
    CodeSent { expires_in_minutes: Option<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The code was accepted; the challenge is complete.
    Verified(VerifiedSession),
    /// The backend rejected the code. Input has been cleared and the
    /// machine is back in `awaiting_entry`; the user may retry.
    Rejected { detail: String },
    /// The call was ignored: a verification is already in flight, the
    /// machine is not awaiting entry, or the code is incomplete.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    /// Cooldown has not elapsed; nothing was sent.
    CoolingDown { seconds_remaining: u32 },
    /// A fresh code was requested.
    Sent(InitiateOutcome),
}

/// The credential handed to the caller on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSession {
    /// Secondary token authorizing the rest of the application, when
    /// the backend issues one.
    pub backend_session_token: Option<String>,
}

pub struct Challenge {
    user_id: String,
    device_fingerprint: String,
    digits: [Option<char>; CODE_LEN],
    status: ChallengeStatus,
    expires_in_minutes: Option<u32>,
    resend_cooldown_seconds: u32,
    focus: usize,
    last_error: Option<String>,
}

impl Challenge {
    pub fn new(user_id: impl Into<String>, device_fingerprint: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            device_fingerprint: device_fingerprint.into(),
            digits: [None; CODE_LEN],
            status: ChallengeStatus::Idle,
            expires_in_minutes: None,
            resend_cooldown_seconds: 0,
            focus: 0,
            last_error: None,
        }
    }

    pub fn status(&self) -> ChallengeStatus {
        self.status
    }

    pub fn digits(&self) -> &[Option<char>; CODE_LEN] {
        &self.digits
    }

    /// Slot the hosting layer should focus next.
    pub fn focus(&self) -> usize {
        self.focus
    }

    pub fn expires_in_minutes(&self) -> Option<u32> {
        self.expires_in_minutes
    }

    pub fn resend_cooldown_seconds(&self) -> u32 {
        self.resend_cooldown_seconds
    }

    /// Last backend rejection detail, verbatim.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Concatenated candidate code, once all six slots are filled.
    pub fn code(&self) -> Option<String> {
        if self.digits.iter().all(|d| d.is_some()) {
            Some(self.digits.iter().flatten().collect())
        } else {
            None
        }
    }

    /// Request a code for the current identity, presenting any locally
    /// stored trust token so a recognized device can skip the exchange.
    #[instrument(level = "debug", skip_all, fields(user_id = %self.user_id))]
    pub async fn initiate(
        &mut self,
        backend: &dyn TwoFactorBackend,
        store: &dyn TrustStore,
    ) -> Result<InitiateOutcome> {
        self.status = ChallengeStatus::Sending;
        self.last_error = None;

        let grant = store.read();
        let device_token = grant.as_ref().map(|g| g.token.as_str());

        let response = match backend.send_code(device_token).await {
            Ok(response) => response,
            Err(e) => {
                if matches!(e, StepUpError::Unauthorized) {
                    forget_local_trust(store);
                }
                self.status = ChallengeStatus::Failed;
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };

        if response.trusted_device || !response.requires_2fa {
            info!(
                trusted_device = response.trusted_device,
                "Challenge satisfied without code exchange"
            );
            self.status = ChallengeStatus::Verified;
            return Ok(InitiateOutcome::Satisfied {
                trusted_device: response.trusted_device,
            });
        }

        if !response.code_sent {
            // The backend required a second factor but dispatched
            // nothing; surface it rather than waiting on a code that
            // will never arrive.
            self.status = ChallengeStatus::Failed;
            let detail = "Backend did not dispatch a verification code".to_string();
            self.last_error = Some(detail.clone());
            return Err(StepUpError::Api(detail));
        }

        self.digits = [None; CODE_LEN];
        self.focus = 0;
        self.expires_in_minutes = response.expires_in_minutes;
        self.status = ChallengeStatus::AwaitingEntry;

        debug!(expires_in_minutes = ?self.expires_in_minutes, "Code dispatched, awaiting entry");
        Ok(InitiateOutcome::CodeSent {
            expires_in_minutes: self.expires_in_minutes,
        })
    }

    /// Enter a single digit (or `None` to clear a slot). Non-digit
    /// input is ignored, not an error. Returns `Submit` exactly when
    /// the sixth digit lands and no verification is in flight.
    pub fn enter_digit(&mut self, index: usize, value: Option<char>) -> EntryEffect {
        if self.status != ChallengeStatus::AwaitingEntry || index >= CODE_LEN {
            return EntryEffect::None;
        }

        match value {
            Some(c) if c.is_ascii_digit() => {
                self.digits[index] = Some(c);
                if self.digits.iter().all(|d| d.is_some()) {
                    EntryEffect::Submit
                } else if index + 1 < CODE_LEN {
                    self.focus = index + 1;
                    EntryEffect::FocusSlot(self.focus)
                } else {
                    EntryEffect::None
                }
            }
            Some(_) => EntryEffect::None,
            None => {
                if self.digits[index].is_some() {
                    self.digits[index] = None;
                    EntryEffect::None
                } else if index > 0 {
                    // Backspace over an empty slot walks backwards.
                    self.focus = index - 1;
                    EntryEffect::FocusSlot(self.focus)
                } else {
                    EntryEffect::None
                }
            }
        }
    }

    /// Paste handler: strips non-digits, and fills all slots only when
    /// exactly six digits remain. Any other count leaves the machine
    /// untouched.
    pub fn paste_digits(&mut self, text: &str) -> EntryEffect {
        if self.status != ChallengeStatus::AwaitingEntry {
            return EntryEffect::None;
        }

        let digits: Vec<char> = text.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() != CODE_LEN {
            return EntryEffect::None;
        }

        for (slot, digit) in self.digits.iter_mut().zip(digits) {
            *slot = Some(digit);
        }
        EntryEffect::Submit
    }

    /// Submit the entered code. On success the machine is terminal
    /// (`verified`) and, when the backend issued a device-trust token
    /// and the user opted in, the grant is persisted before success is
    /// reported. On rejection the machine returns to `awaiting_entry`
    /// with cleared input and focus-intent on slot 0.
    #[instrument(level = "debug", skip_all, fields(user_id = %self.user_id, remember_device))]
    pub async fn verify(
        &mut self,
        backend: &dyn TwoFactorBackend,
        store: &dyn TrustStore,
        remember_device: bool,
    ) -> Result<VerifyOutcome> {
        if self.status != ChallengeStatus::AwaitingEntry {
            // Covers an in-flight verification: two submissions of a
            // single-use code must never race.
            return Ok(VerifyOutcome::Ignored);
        }
        let Some(code) = self.code() else {
            return Ok(VerifyOutcome::Ignored);
        };

        self.status = ChallengeStatus::Verifying;
        self.last_error = None;

        let request = VerifyCodeRequest {
            user_id: self.user_id.clone(),
            code,
            device_fingerprint: self.device_fingerprint.clone(),
            remember_device,
        };

        let response = match backend.verify_code(&request).await {
            Ok(response) => response,
            Err(StepUpError::Rejected { detail }) => {
                self.reset_entry(Some(detail.clone()));
                return Ok(VerifyOutcome::Rejected { detail });
            }
            Err(e) => {
                if matches!(e, StepUpError::Unauthorized) {
                    forget_local_trust(store);
                }
                // Transient failures also clear input: the code may
                // have been consumed server-side, so it must not be
                // resubmitted automatically.
                self.reset_entry(Some(e.to_string()));
                return Err(e);
            }
        };

        if !response.success {
            let detail = "Verification failed".to_string();
            self.reset_entry(Some(detail.clone()));
            return Ok(VerifyOutcome::Rejected { detail });
        }

        if remember_device {
            match (response.device_token, response.expires_at) {
                (Some(token), Some(expires_at)) => {
                    let grant = TrustedDeviceGrant {
                        token,
                        expires_at,
                        device_fingerprint: self.device_fingerprint.clone(),
                    };
                    // A failed write only costs a future re-challenge;
                    // the verification itself stands.
                    if let Err(e) = store.store(&grant) {
                        warn!(error = %e, "Failed to persist trust grant");
                    }
                }
                _ => {
                    debug!("Backend issued no trust grant despite remember_device");
                }
            }
        }

        self.status = ChallengeStatus::Verified;
        info!("Challenge verified");
        Ok(VerifyOutcome::Verified(VerifiedSession {
            backend_session_token: response.backend_session_token,
        }))
    }

    /// Request a fresh code. A no-op while the cooldown is running;
    /// otherwise re-initiates and, on success, arms the 30 second
    /// cooldown.
    pub async fn resend(
        &mut self,
        backend: &dyn TwoFactorBackend,
        store: &dyn TrustStore,
    ) -> Result<ResendOutcome> {
        if self.resend_cooldown_seconds > 0 {
            return Ok(ResendOutcome::CoolingDown {
                seconds_remaining: self.resend_cooldown_seconds,
            });
        }

        let outcome = self.initiate(backend, store).await?;
        self.resend_cooldown_seconds = RESEND_COOLDOWN_SECS;
        Ok(ResendOutcome::Sent(outcome))
    }

    /// One-second cadence tick for the resend cooldown.
    pub fn tick_cooldown(&mut self) {
        self.resend_cooldown_seconds = self.resend_cooldown_seconds.saturating_sub(1);
    }

    /// One-minute cadence tick for the code-expiry display. Clamped at
    /// zero; expiry itself is adjudicated by the backend.
    pub fn tick_expiry(&mut self) {
        if let Some(minutes) = self.expires_in_minutes {
            self.expires_in_minutes = Some(minutes.saturating_sub(1));
        }
    }

    fn reset_entry(&mut self, error: Option<String>) {
        self.digits = [None; CODE_LEN];
        self.focus = 0;
        self.status = ChallengeStatus::AwaitingEntry;
        self.last_error = error;
    }
}

/// A 401 means the primary credential itself was rejected; a trust
/// grant must not outlive it. Called on `Unauthorized` from any
/// backend call before the error propagates.
pub(crate) fn forget_local_trust(store: &dyn TrustStore) {
    warn!("Primary credential rejected, clearing local trust grant");
    if let Err(e) = store.clear() {
        warn!(error = %e, "Failed to clear trust grant after 401");
    }
}
