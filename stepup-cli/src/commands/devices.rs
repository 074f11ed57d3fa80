//! Trusted-device administration commands.

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use stepup_core::{DevicePanel, SessionTokens, TrustedDeviceRecord};

use crate::utils;

/// List the identity's trusted devices.
pub async fn list() -> Result<()> {
    let backend = utils::backend()?;
    let store = utils::trust_store()?;
    let mut session = SessionTokens::new(utils::primary_token()?);
    let mut panel = DevicePanel::new();

    let records = panel
        .refresh(&backend, &store, &mut session)
        .await
        .context("Failed to fetch trusted devices")?;

    if records.is_empty() {
        println!("No trusted devices.");
        return Ok(());
    }

    for record in records {
        print_record(record);
    }
    Ok(())
}

/// Revoke one trusted-device grant.
pub async fn revoke(device_id: String) -> Result<()> {
    let backend = utils::backend()?;
    let store = utils::trust_store()?;
    let mut session = SessionTokens::new(utils::primary_token()?);
    let mut panel = DevicePanel::new();

    panel
        .refresh(&backend, &store, &mut session)
        .await
        .context("Failed to fetch trusted devices")?;

    let outcome = panel
        .revoke(&backend, &store, &mut session, &device_id)
        .await
        .context("Failed to revoke device")?;

    info!(device_id = %device_id, cleared_local_trust = outcome.cleared_local_trust, "Device revoked");
    println!("{}", format!("Revoked device {device_id}.").green());
    if outcome.cleared_local_trust {
        println!(
            "   {}",
            "That was this device: local trust cleared, next sign-in will be challenged.".dimmed()
        );
    }
    Ok(())
}

fn print_record(record: &TrustedDeviceRecord) {
    let name = record.device_name.as_deref().unwrap_or("(unnamed device)");
    let status = if record.is_active {
        "active".green()
    } else {
        "inactive".dimmed()
    };

    println!("{} {} [{status}]", record.id.bold(), name);
    if let Some(ip) = &record.ip_address {
        println!("   {} {ip}", "From:".dimmed());
    }
    println!(
        "   {} {}",
        "Added:".dimmed(),
        utils::format_timestamp(record.created_at)
    );
    println!(
        "   {} {}",
        "Last used:".dimmed(),
        utils::format_timestamp(record.last_used_at)
    );
    println!(
        "   {} {}",
        "Expires:".dimmed(),
        utils::format_timestamp(record.expires_at)
    );
}
