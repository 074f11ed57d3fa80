//! Logout command: drop the persisted trust grant.
//!
//! The session-token pair only lives inside a running process, so the
//! grant file is the one piece of durable state to remove here.

use anyhow::{Context, Result};
use colored::Colorize;
use stepup_core::TrustStore;

use crate::utils;

pub fn execute() -> Result<()> {
    let store = utils::trust_store()?;
    store.clear().context("Failed to clear trust grant")?;
    println!(
        "{}",
        "Signed out. The next sign-in on this device will be challenged.".green()
    );
    Ok(())
}
