//! CLI integration tests for stepup-cli.
//!
//! These tests run the actual binary and check help output, exit
//! codes, and behavior that needs no live backend.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the stepup binary.
fn stepup() -> Command {
    Command::cargo_bin("stepup").unwrap()
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    stepup()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Two-factor step-up verification"))
        .stdout(predicate::str::contains("verify"))
        .stdout(predicate::str::contains("devices"))
        .stdout(predicate::str::contains("logout"));
}

#[test]
fn test_version_displays_version() {
    stepup()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stepup"));
}

#[test]
fn test_help_shows_exit_codes() {
    stepup()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("78"));
}

#[test]
fn test_verify_help_shows_options() {
    stepup()
        .args(["verify", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--user-id"))
        .stdout(predicate::str::contains("--remember"));
}

#[test]
fn test_devices_help_shows_subcommands() {
    stepup()
        .args(["devices", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("revoke"));
}

#[test]
fn test_unknown_subcommand_fails() {
    stepup().arg("frobnicate").assert().failure();
}

// ============================================================================
// Configuration Errors
// ============================================================================

#[test]
fn test_verify_without_api_url_is_config_error() {
    stepup()
        .args(["verify", "--user-id", "user-1"])
        .env_remove("STEPUP_API_URL")
        .env_remove("STEPUP_PRIMARY_TOKEN")
        .assert()
        .failure()
        .code(78)
        .stderr(predicate::str::contains("STEPUP_API_URL"));
}

#[test]
fn test_devices_list_without_token_is_config_error() {
    stepup()
        .args(["devices", "list"])
        .env("STEPUP_API_URL", "https://api.example.org")
        .env_remove("STEPUP_PRIMARY_TOKEN")
        .assert()
        .failure()
        .code(78)
        .stderr(predicate::str::contains("STEPUP_PRIMARY_TOKEN"));
}

// ============================================================================
// Logout
// ============================================================================

#[test]
fn test_logout_removes_trust_file() {
    let dir = TempDir::new().unwrap();
    let trust_file = dir.path().join("trusted_device.json");
    std::fs::write(
        &trust_file,
        r#"{"token":"abc","expires_at":"2099-01-01T00:00:00Z","device_fingerprint":"fp"}"#,
    )
    .unwrap();

    stepup()
        .arg("logout")
        .env("STEPUP_TRUST_FILE", &trust_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out"));

    assert!(!trust_file.exists());
}

#[test]
fn test_logout_without_trust_file_succeeds() {
    let dir = TempDir::new().unwrap();
    stepup()
        .arg("logout")
        .env("STEPUP_TRUST_FILE", dir.path().join("missing.json"))
        .assert()
        .success();
}
