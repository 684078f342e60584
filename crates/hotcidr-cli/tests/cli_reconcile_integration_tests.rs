//! CLI reconcile integration tests
//!
//! These tests run the `hotcidr` binary against temporary desired and
//! sandbox state directories.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn setup_state(temp_dir: &TempDir) -> (PathBuf, PathBuf) {
    let desired = temp_dir.path().join("desired");
    let actual = temp_dir.path().join("actual");
    fs::create_dir_all(desired.join("groups")).unwrap();
    fs::create_dir_all(&actual).unwrap();

    fs::write(
        desired.join("groups").join("web.yaml"),
        r#"
description: Web tier
rules:
  - direction: inbound
    protocol: tcp
    location: 0.0.0.0/0
    ports: 443
  - direction: outbound
    protocol: tcp
    location: 10.0.0.0/8
    ports: 5432
"#,
    )
    .unwrap();

    (desired, actual)
}

fn hotcidr(args: &[&str], desired: &Path, actual: &Path) -> Output {
    let cli_bin = env!("CARGO_BIN_EXE_hotcidr");
    Command::new(cli_bin)
        .args(args)
        .args([
            "--desired",
            desired.to_str().unwrap(),
            "--actual",
            actual.to_str().unwrap(),
        ])
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute CLI")
}

fn stdout_lines(output: &Output) -> Vec<String> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_cli_plan_prints_actions_without_saving() {
    let temp_dir = TempDir::new().unwrap();
    let (desired, actual) = setup_state(&temp_dir);

    let output = hotcidr(&["plan"], &desired, &actual);

    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(
        stdout_lines(&output),
        vec![
            "Action 1/3: Create new security group web (Web tier)",
            "Action 2/3: Add rule (tcp, 443, 0.0.0.0/0) to web",
            "Action 3/3: Add rule (tcp, 5432, 10.0.0.0/8) to web",
            "1 group(s) created, 2 rule(s) added",
        ]
    );
    assert!(!actual.join("groups").exists());
}

#[test]
fn test_cli_apply_converges_sandbox() {
    let temp_dir = TempDir::new().unwrap();
    let (desired, actual) = setup_state(&temp_dir);

    let first = hotcidr(&["apply"], &desired, &actual);
    assert!(first.status.success());
    assert!(actual.join("groups").join("web.yaml").is_file());

    let second = hotcidr(&["apply"], &desired, &actual);
    assert!(second.status.success());
    assert_eq!(stdout_lines(&second), vec!["No changes"]);
}

#[test]
fn test_cli_apply_dry_run_does_not_save() {
    let temp_dir = TempDir::new().unwrap();
    let (desired, actual) = setup_state(&temp_dir);

    let output = hotcidr(&["apply", "--dry-run"], &desired, &actual);

    assert!(output.status.success());
    assert_eq!(stdout_lines(&output).len(), 4);
    assert!(!actual.join("groups").exists());
}

#[test]
fn test_cli_invalid_direction_exits_nonzero_after_summary() {
    let temp_dir = TempDir::new().unwrap();
    let (desired, actual) = setup_state(&temp_dir);
    fs::write(
        desired.join("groups").join("bad.yaml"),
        "rules:\n  - direction: sideways\n    protocol: tcp\n    location: all\n",
    )
    .unwrap();

    let output = hotcidr(&["apply"], &desired, &actual);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERR_INVALID_DIRECTION"), "stderr: {}", stderr);

    let lines = stdout_lines(&output);
    assert_eq!(
        lines.last().map(String::as_str),
        Some("2 group(s) created, 3 rule(s) added")
    );
    // Both groups were created before the failing rule and are persisted.
    assert!(actual.join("groups").join("bad.yaml").is_file());
    assert!(actual.join("groups").join("web.yaml").is_file());
}

#[test]
fn test_cli_missing_actual_dir_fails() {
    let temp_dir = TempDir::new().unwrap();
    let (desired, _) = setup_state(&temp_dir);

    let output = hotcidr(&["plan"], &desired, &temp_dir.path().join("missing"));

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERR_INVALID_SNAPSHOT"));
}

#[test]
fn test_cli_trace_id_from_env_tags_execution_failure() {
    let temp_dir = TempDir::new().unwrap();
    let (desired, actual) = setup_state(&temp_dir);
    fs::write(
        desired.join("groups").join("bad.yaml"),
        "rules:\n  - direction: sideways\n    protocol: tcp\n    location: all\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_hotcidr"))
        .args(["plan", "--desired", desired.to_str().unwrap()])
        .args(["--actual", actual.to_str().unwrap()])
        .env("RUST_LOG", "off")
        .env("HOTCIDR_TRACE_ID", "ci-build-42")
        .output()
        .expect("Failed to execute CLI");

    // Dry run only announces actions, so the bad rule never fails.
    assert!(output.status.success());

    let output = Command::new(env!("CARGO_BIN_EXE_hotcidr"))
        .args(["apply", "--desired", desired.to_str().unwrap()])
        .args(["--actual", actual.to_str().unwrap()])
        .env("RUST_LOG", "off")
        .env("HOTCIDR_TRACE_ID", "ci-build-42")
        .output()
        .expect("Failed to execute CLI");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("(trace_id: ci-build-42)"), "stderr: {}", stderr);
}

#[test]
fn test_cli_trace_id_flag_tags_execution_failure() {
    let temp_dir = TempDir::new().unwrap();
    let (desired, actual) = setup_state(&temp_dir);
    fs::write(
        desired.join("groups").join("bad.yaml"),
        "rules:\n  - direction: sideways\n    protocol: tcp\n    location: all\n",
    )
    .unwrap();

    let output = hotcidr(&["apply", "--trace-id", "job-7"], &desired, &actual);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERR_INVALID_DIRECTION"), "stderr: {}", stderr);
    assert!(stderr.contains("(trace_id: job-7)"), "stderr: {}", stderr);
}
