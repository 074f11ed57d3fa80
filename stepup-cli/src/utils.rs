//! Common utility functions shared across CLI commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use stepup_core::{BackendConfig, FileTrustStore, HttpBackend};

/// Environment variable carrying the primary identity token.
pub const PRIMARY_TOKEN_VAR: &str = "STEPUP_PRIMARY_TOKEN";

/// Environment variable overriding the trust grant location.
pub const TRUST_FILE_VAR: &str = "STEPUP_TRUST_FILE";

/// Read the primary identity token from the environment.
pub fn primary_token() -> Result<String> {
    std::env::var(PRIMARY_TOKEN_VAR)
        .with_context(|| format!("{PRIMARY_TOKEN_VAR} environment variable not set"))
}

/// Resolve where the trust grant lives on disk.
///
/// `STEPUP_TRUST_FILE` wins; otherwise
/// `~/.config/stepup/trusted_device.json`.
pub fn trust_store_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(TRUST_FILE_VAR) {
        return Ok(PathBuf::from(path));
    }
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("stepup")
        .join("trusted_device.json"))
}

/// Open the file-backed trust store at its configured location.
pub fn trust_store() -> Result<FileTrustStore> {
    Ok(FileTrustStore::new(trust_store_path()?))
}

/// Build the HTTP backend from the environment.
pub fn backend() -> Result<HttpBackend> {
    let config = BackendConfig::from_env()?;
    let token = primary_token()?;
    Ok(HttpBackend::new(config, token)?)
}

/// Format a UTC timestamp for device listings.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
