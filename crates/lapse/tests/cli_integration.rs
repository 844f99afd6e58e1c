//! CLI integration tests for the Lapse command-line interface.
//!
//! These tests verify:
//! - Help text is displayed correctly
//! - The demo round trip prints the stored value
//! - Short idle timeouts lead to observed evictions
//! - Config files and flags are honoured, and bad values rejected

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a command for the lapse binary.
fn lapse() -> Command {
    Command::cargo_bin("lapse").unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_displays() {
    lapse()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Lapse"))
        .stdout(predicate::str::contains("demo"))
        .stdout(predicate::str::contains("load"));
}

#[test]
fn test_version_displays() {
    lapse()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("lapse"));
}

#[test]
fn test_demo_help() {
    lapse()
        .args(["demo", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--wait"));
}

#[test]
fn test_load_help() {
    lapse()
        .args(["load", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--sessions"))
        .stdout(predicate::str::contains("--slack-ms"));
}

#[test]
fn test_missing_subcommand_fails() {
    lapse().assert().failure();
}

// ─────────────────────────────────────────────────────────────────────────────
// Demo Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_demo_round_trip() {
    lapse()
        .arg("demo")
        .assert()
        .success()
        .stdout(predicate::str::contains("longhoang.de"));
}

#[test]
fn test_demo_json_output() {
    let output = lapse()
        .args(["--json", "demo", "--key", "theme", "--value", "dark"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["data"]["theme"], "dark");
    assert_eq!(parsed["idle_timeout_ms"], 5000);
    assert!(parsed.get("evicted_after_ms").is_none());
}

#[test]
fn test_demo_wait_reports_eviction() {
    let output = lapse()
        .args([
            "--json",
            "--idle-timeout-ms",
            "200",
            "--sweep-interval-ms",
            "20",
            "demo",
            "--wait",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let evicted_after = parsed["evicted_after_ms"].as_u64().unwrap();
    assert!(evicted_after >= 200, "evicted after {evicted_after}ms");
}

#[test]
fn test_config_file_applied() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[store]\nidle_timeout_ms = 150\nsweep_interval_ms = 10").unwrap();

    let output = lapse()
        .arg("--config")
        .arg(file.path())
        .args(["--json", "demo"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["idle_timeout_ms"], 150);
}

#[test]
fn test_wait_rejected_without_sweeper() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[store]\nsweeper = false").unwrap();

    lapse()
        .arg("--config")
        .arg(file.path())
        .args(["demo", "--wait"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sweeper"));
}

#[test]
fn test_zero_idle_timeout_rejected() {
    lapse()
        .args(["--idle-timeout-ms", "0", "demo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("idle_timeout"));
}

#[test]
fn test_sweep_interval_longer_than_slack_rejected() {
    lapse()
        .args(["--idle-timeout-ms", "1000", "--sweep-interval-ms", "500", "demo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sweep_interval"));
}

#[test]
fn test_missing_config_file_rejected() {
    lapse()
        .args(["--config", "/nonexistent/lapse.toml", "demo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("/nonexistent/lapse.toml"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Load Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_load_inside_window() {
    let output = lapse()
        .args([
            "--json",
            "--idle-timeout-ms",
            "300",
            "--sweep-interval-ms",
            "20",
            "load",
            "-n",
            "50",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["sessions"], 50);
    assert_eq!(parsed["evicted"], 50);
    assert_eq!(parsed["within_window"], true);
    assert!(parsed["min_latency_ms"].as_u64().unwrap() >= 300);
}
