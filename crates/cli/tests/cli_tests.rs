//! CLI integration tests

use std::process::Command;

fn zonectl() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_zonectl"));
    cmd.env_remove("ZONECTL_API_URL");
    cmd
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = zonectl()
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("zone sync daemon"), "Should show about text");
    assert!(stdout.contains("status"), "Should show status command");
    assert!(stdout.contains("sync"), "Should show sync command");
    assert!(stdout.contains("health"), "Should show health command");
    assert!(stdout.contains("--api-url"), "Should show api-url option");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = zonectl()
        .arg("--version")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("zonectl"), "Should show binary name");
}

/// Test that output format is validated
#[test]
fn test_invalid_format_rejected() {
    let output = zonectl()
        .args(["--format", "yaml", "status"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Unknown format should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("yaml"), "Should name the rejected value");
}

/// Test that a missing subcommand is an error
#[test]
fn test_subcommand_required() {
    let output = zonectl().output().expect("Failed to execute command");
    assert!(!output.status.success(), "Bare invocation should fail");
}

/// Test that an unreachable daemon is reported
#[test]
fn test_unreachable_daemon_fails() {
    let output = zonectl()
        .args(["--api-url", "http://127.0.0.1:9", "--timeout", "2", "status"])
        .output()
        .expect("Failed to execute command");

    assert!(!output.status.success(), "Status should fail without a daemon");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to send request"),
        "Should explain the failure"
    );
}
