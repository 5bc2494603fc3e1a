//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with a temporary data directory and verify
//! outputs.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(home: &Path, args: &[&str]) -> (String, String, i32) {
    run_cli_with_input(home, args, "")
}

fn run_cli_with_input(home: &Path, args: &[&str], input: &str) -> (String, String, i32) {
    let mut child = Command::new(env!("CARGO_BIN_EXE_focusroom"))
        .args(args)
        .env("FOCUSROOM_HOME", home)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to execute CLI command");
    child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(input.as_bytes())
        .expect("Failed to write stdin");
    let output = child.wait_with_output().expect("Failed to wait for CLI");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn test_config_list_has_defaults() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "list"]);
    assert_eq!(code, 0, "config list failed");
    assert!(stdout.contains("timer.work_duration = 25"));
    assert!(stdout.contains("behavior.auto_start_breaks = true"));
    assert!(home.path().join("config.toml").exists());
}

#[test]
fn test_config_set_and_get() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["config", "set", "timer.work_duration", "50"]);
    assert_eq!(code, 0, "config set failed");
    assert_eq!(stdout.trim(), "ok");

    let (stdout, _, code) = run_cli(home.path(), &["config", "get", "timer.work_duration"]);
    assert_eq!(code, 0, "config get failed");
    assert_eq!(stdout.trim(), "50");
}

#[test]
fn test_config_rejects_invalid_value() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "set", "timer.sessions_until_long_break", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));

    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "timer.sessions_until_long_break"]);
    assert_eq!(stdout.trim(), "4");
}

#[test]
fn test_config_unknown_key() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["config", "get", "timer.nope"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_config_reset() {
    let home = tempfile::tempdir().unwrap();
    run_cli(home.path(), &["config", "set", "notifications.sound_volume", "80"]);
    let (_, _, code) = run_cli(home.path(), &["config", "reset"]);
    assert_eq!(code, 0);
    let (stdout, _, _) = run_cli(home.path(), &["config", "get", "notifications.sound_volume"]);
    assert_eq!(stdout.trim(), "50");
}

#[test]
fn test_stats_today_json() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["stats", "today"]);
    assert_eq!(code, 0, "stats today failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["total_pomodoros"], 0);
}

#[test]
fn test_stats_week_json() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["stats", "week", "--start", "2024-03-04"]);
    assert_eq!(code, 0, "stats week failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["week_end"], "2024-03-10");
    assert_eq!(parsed["daily_breakdown"].as_array().unwrap().len(), 7);
}

#[test]
fn test_stats_today_has_task_breakdown() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["stats", "today"]);
    assert_eq!(code, 0, "stats today failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed["task_breakdown"].as_array().unwrap().is_empty());
}

#[test]
fn test_stats_task_json() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(home.path(), &["stats", "task", "write-report"]);
    assert_eq!(code, 0, "stats task failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["task_id"], "write-report");
    assert_eq!(parsed["total_pomodoros"], 0);
    assert!(parsed["first_session"].is_null());
}

#[test]
fn test_stats_log_filters() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(
        home.path(),
        &["stats", "log", "--task", "t1", "--from", "2024-03-01", "--to", "2024-03-31"],
    );
    assert_eq!(code, 0, "stats log failed");
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(parsed.as_array().unwrap().is_empty());

    let (_, stderr, code) = run_cli(home.path(), &["stats", "log", "--from", "March"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("--from"));
}

#[test]
fn test_stats_delete_missing() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["stats", "delete", "99"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_run_quits_on_q() {
    let home = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli_with_input(home.path(), &["run", "--work", "1"], "p\nq\n");
    assert_eq!(code, 0, "run failed");
    assert!(stdout.contains("Focus session"));
}

#[test]
fn test_run_rejects_zero_duration() {
    let home = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(home.path(), &["run", "--work", "0"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("error:"));
}
