//! Integration tests for the `netzone` CLI binary.
//!
//! Every test gets its own config path and mapping document in a temp dir,
//! so nothing touches the user's real configuration.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

// ── Helpers ─────────────────────────────────────────────────────────

fn netzone_cmd(dir: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("netzone");
    cmd.env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join("xdg"))
        .env("NETZONE_CONFIG", dir.join("config.toml"))
        .env("NETZONE_STORE__PATH", dir.join("mappings.json"))
        .env_remove("NETZONE_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

fn add_mapping(dir: &Path, kind: &str, key: &str, value: &str) {
    netzone_cmd(dir)
        .args(["mappings", "add", kind, key, value])
        .assert()
        .success();
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let dir = TempDir::new().unwrap();
    let output = netzone_cmd(dir.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    netzone_cmd(dir.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("mappings")
            .and(predicate::str::contains("policy"))
            .and(predicate::str::contains("serve")),
    );
}

#[test]
fn test_completions_bash() {
    let dir = TempDir::new().unwrap();
    netzone_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("netzone"));
}

// ── Mappings ────────────────────────────────────────────────────────

#[test]
fn test_add_persists_and_lists() {
    let dir = TempDir::new().unwrap();
    add_mapping(dir.path(), "router_identifier_mapping", "10.0.0.1", "edge-1");
    add_mapping(dir.path(), "interface_mapping", "eth0", "lan");

    let document = std::fs::read_to_string(dir.path().join("mappings.json")).unwrap();
    assert!(document.contains("edge-1"));

    let output = netzone_cmd(dir.path())
        .args(["-o", "json", "mappings", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let rows = stdout_json(&output);
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[0]["type"], "router_identifier_mapping");
    assert_eq!(rows[0]["key"], "10.0.0.1");
    assert_eq!(rows[1]["type"], "interface_mapping");

    let output = netzone_cmd(dir.path())
        .args(["-o", "json", "mappings", "list", "--type", "interface_mapping"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output).as_array().unwrap().len(), 1);
}

#[test]
fn test_add_rejects_unknown_type() {
    let dir = TempDir::new().unwrap();
    netzone_cmd(dir.path())
        .args(["mappings", "add", "dns_mapping", "a", "b"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("dns_mapping"));
}

#[test]
fn test_add_rejects_invalid_ip_key() {
    let dir = TempDir::new().unwrap();
    netzone_cmd(dir.path())
        .args(["mappings", "add", "router_identifier_mapping", "10.0.0", "x"])
        .assert()
        .code(2);
}

#[test]
fn test_remove_missing_key_is_not_found() {
    let dir = TempDir::new().unwrap();
    netzone_cmd(dir.path())
        .args(["-y", "mappings", "remove", "router_mapping", "nope"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_remove_without_yes_refuses_non_interactive() {
    let dir = TempDir::new().unwrap();
    add_mapping(dir.path(), "router_mapping", "edge-key", "edge-1");
    netzone_cmd(dir.path())
        .args(["mappings", "remove", "router_mapping", "edge-key"])
        .assert()
        .code(2);

    netzone_cmd(dir.path())
        .args(["--yes", "mappings", "remove", "router_mapping", "edge-key"])
        .assert()
        .success();
    let output = netzone_cmd(dir.path())
        .args(["-o", "json", "mappings", "list"])
        .output()
        .unwrap();
    assert!(stdout_json(&output).as_array().unwrap().is_empty());
}

#[test]
fn test_dry_run_reports_hits() {
    let dir = TempDir::new().unwrap();
    add_mapping(dir.path(), "router_identifier_mapping", "10.0.0.1", "edge-1");
    add_mapping(dir.path(), "interface_mapping", "eth1", "branch");

    let output = netzone_cmd(dir.path())
        .args(["-o", "json", "mappings", "test", "10.0.0.1", "-i", "eth1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let report = stdout_json(&output);
    assert_eq!(report["test_result"]["router_identifier_mapping"], "edge-1");
    assert!(report["test_result"]["router_mapping"].is_null());
    assert_eq!(report["test_result"]["interface_mapping"], "branch");
    assert_eq!(report["resolved_zone_identifier"], "edge-1");
    assert_eq!(report["zone_preview"]["outcome"], "rejected");
}

#[test]
fn test_dry_run_invalid_ip() {
    let dir = TempDir::new().unwrap();
    netzone_cmd(dir.path())
        .args(["mappings", "test", "300.1.1.1"])
        .assert()
        .code(2);
}

// ── Policy ──────────────────────────────────────────────────────────

#[test]
fn test_policy_set_merges() {
    let dir = TempDir::new().unwrap();
    netzone_cmd(dir.path())
        .args(["policy", "set", "--allow-unknown-zones", "true"])
        .assert()
        .success();
    netzone_cmd(dir.path())
        .args(["policy", "set", "--auto-create-zones", "true"])
        .assert()
        .success();

    let output = netzone_cmd(dir.path())
        .args(["-o", "json", "policy", "show"])
        .output()
        .unwrap();
    let settings = stdout_json(&output);
    assert_eq!(settings["allow_unknown_zones"], true);
    assert_eq!(settings["auto_create_zones"], true);
    assert_eq!(settings["allow_unknown_devices"], false);

    let output = netzone_cmd(dir.path())
        .args(["-o", "json", "mappings", "test", "10.1.1.1"])
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output)["zone_preview"]["outcome"], "default_fallback");
}

#[test]
fn test_policy_set_requires_a_switch() {
    let dir = TempDir::new().unwrap();
    netzone_cmd(dir.path())
        .args(["policy", "set"])
        .assert()
        .code(2);
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_honors_override() {
    let dir = TempDir::new().unwrap();
    netzone_cmd(dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    netzone_cmd(dir.path())
        .args(["config", "init"])
        .assert()
        .success();
    let written = std::fs::read_to_string(dir.path().join("config.toml")).unwrap();
    assert!(written.contains("[server]"));

    netzone_cmd(dir.path())
        .args(["config", "init"])
        .assert()
        .code(6);
    netzone_cmd(dir.path())
        .args(["config", "init", "--force"])
        .assert()
        .success();
}

#[test]
fn test_config_show_reflects_env_override() {
    let dir = TempDir::new().unwrap();
    let output = netzone_cmd(dir.path())
        .env("NETZONE_SERVER__LISTEN", "0.0.0.0:9999")
        .args(["-o", "json", "config", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["server"]["listen"], "0.0.0.0:9999");
}
