//! Verify command: the interactive challenge loop.
//!
//! This command is the "hosting layer" the library expects: it owns
//! the one-second timer, reads code entry from stdin, and feeds both
//! into the challenge state machine. The timer and the input stream
//! live inside this function, so dropping out of it (success, cancel,
//! error) cancels them with it.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval_at, Instant};
use tracing::{debug, info};

use stepup_core::{
    clear_local_auth, generate_fingerprint, Challenge, EntryEffect, InitiateOutcome, ResendOutcome,
    SessionTokens, StepUpError, TrustStore, TwoFactorBackend, VerifyOutcome,
};

use crate::utils;

/// Execute the verify command.
pub async fn execute(user_id: String, remember: bool) -> Result<()> {
    let backend = utils::backend()?;
    let store = utils::trust_store()?;
    let mut session = SessionTokens::new(utils::primary_token()?);
    let mut challenge = Challenge::new(user_id, generate_fingerprint());

    let outcome = match challenge.initiate(&backend, &store).await {
        Ok(outcome) => outcome,
        Err(StepUpError::Unauthorized) => {
            clear_local_auth(&mut session, &store).ok();
            return Err(StepUpError::Unauthorized).context("Primary credential rejected");
        }
        Err(e) => return Err(e).context("Failed to request a verification code"),
    };

    match outcome {
        InitiateOutcome::Satisfied { trusted_device } => {
            info!(trusted_device, "Challenge satisfied without code entry");
            if trusted_device {
                println!("{}", "Device recognized - no code required.".green());
            } else {
                println!("{}", "No second factor required for this identity.".green());
            }
            return Ok(());
        }
        InitiateOutcome::CodeSent { expires_in_minutes } => {
            println!("{}", "A verification code has been sent.".bold());
            if let Some(minutes) = expires_in_minutes {
                println!("   {} {minutes} minutes", "Expires in:".dimmed());
            }
        }
    }

    println!(
        "Enter the 6-digit code, {} to resend, {} to cancel:",
        "r".bold(),
        "q".bold()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    // First tick after a full second, then every second.
    let mut ticker = interval_at(Instant::now() + Duration::from_secs(1), Duration::from_secs(1));
    let mut seconds_elapsed: u64 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                challenge.tick_cooldown();
                seconds_elapsed += 1;
                if seconds_elapsed % 60 == 0 {
                    challenge.tick_expiry();
                    if challenge.expires_in_minutes() == Some(0) {
                        println!(
                            "{}",
                            "The code may have expired. Press r to request a new one.".yellow()
                        );
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    bail!("Input closed before verification completed");
                };
                match line.trim() {
                    "" => {}
                    "q" => bail!("Verification cancelled"),
                    "r" => handle_resend(&mut challenge, &backend, &store, &mut session).await?,
                    text => {
                        if handle_entry(&mut challenge, &backend, &store, &mut session, remember, text)
                            .await?
                        {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}

async fn handle_resend(
    challenge: &mut Challenge,
    backend: &dyn TwoFactorBackend,
    store: &dyn TrustStore,
    session: &mut SessionTokens,
) -> Result<()> {
    match challenge.resend(backend, store).await {
        Ok(ResendOutcome::CoolingDown { seconds_remaining }) => {
            println!(
                "{}",
                format!("Please wait {seconds_remaining}s before resending.").yellow()
            );
        }
        Ok(ResendOutcome::Sent(_)) => {
            println!("{}", "A new code has been sent.".green());
        }
        Err(StepUpError::Unauthorized) => {
            clear_local_auth(session, store).ok();
            return Err(StepUpError::Unauthorized).context("Primary credential rejected");
        }
        Err(e) => {
            println!("{}", format!("Resend failed: {e}").red());
        }
    }
    Ok(())
}

/// Feed one line of input into the machine. Returns `true` once the
/// challenge completes.
async fn handle_entry(
    challenge: &mut Challenge,
    backend: &dyn TwoFactorBackend,
    store: &dyn TrustStore,
    session: &mut SessionTokens,
    remember: bool,
    text: &str,
) -> Result<bool> {
    if challenge.paste_digits(text) != EntryEffect::Submit {
        println!("{}", "Enter exactly 6 digits.".yellow());
        return Ok(false);
    }

    debug!("Submitting entered code");
    match challenge.verify(backend, store, remember).await {
        Ok(VerifyOutcome::Verified(verified)) => {
            if let Some(token) = verified.backend_session_token {
                session.set_backend_session(token);
            }
            println!();
            println!("{}", "Verification successful.".green().bold());
            if remember {
                println!("   {}", "This device will be remembered.".dimmed());
            }
            Ok(true)
        }
        Ok(VerifyOutcome::Rejected { detail }) => {
            println!("{}", detail.red());
            println!("Try again, or press {} to resend.", "r".bold());
            Ok(false)
        }
        Ok(VerifyOutcome::Ignored) => Ok(false),
        Err(StepUpError::Unauthorized) => {
            // The primary credential itself is no longer valid; a
            // cached trust grant must not outlive it.
            clear_local_auth(session, store).ok();
            Err(StepUpError::Unauthorized).context("Primary credential rejected")
        }
        Err(e) => {
            println!("{}", format!("Verification error: {e}").red());
            println!("The entered code was cleared; try again or resend.");
            Ok(false)
        }
    }
}
