//! Integration tests for the `ruletrace` binary.
//!
//! Tests cover:
//! - trace with environment and spec files, JSON on stdout
//! - mode selection through config file, environment variable and flag
//! - strict compile failures (exit code, partial result)
//! - atoms, fingerprint, validate and playground subcommands

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn ruletrace(args: &[&str]) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ruletrace"));
    cmd.args(args).env_remove("RULETRACE_MODE");
    cmd
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("JSON on stdout")
}

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

// ---------------------------------------------------------------------------
// trace
// ---------------------------------------------------------------------------

#[test]
fn trace_with_env_and_specs() {
    let dir = TempDir::new().unwrap();
    let env = write(&dir, "env.json", r#"{"user": {"Id": 1}, "comment": {"UserId": 1}}"#);

    let fp = ruletrace(&["fingerprint", "user.Id == comment.UserId"]).output().unwrap();
    let fp = String::from_utf8(fp.stdout).unwrap().trim().to_string();
    let specs = write(
        &dir,
        "specs.json",
        &format!(r#"{{"{fp}": {{"ID": "c_owner", "ReasonTrue": "IS_OWNER", "ReasonFalse": "NOT_OWNER"}}}}"#),
    );

    let output = ruletrace(&[
        "trace",
        "--expr",
        "user.Id == comment.UserId",
        "--env",
        env.to_str().unwrap(),
        "--specs",
        specs.to_str().unwrap(),
    ])
    .output()
    .unwrap();

    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["final"], Value::Bool(true));
    assert_eq!(json["chunks"][0]["id"], "c_owner");
    assert_eq!(json["chunks"][0]["reason"], "IS_OWNER");
    assert_eq!(json["mode"], "atomic");
}

#[test]
fn mode_precedence() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "config.json", r#"{"mode": "coarse"}"#);
    let config = config.to_str().unwrap();

    let output = ruletrace(&["trace", "--expr", "1 == 1", "--config", config]).output().unwrap();
    assert_eq!(stdout_json(&output)["mode"], "coarse");

    let output = ruletrace(&["trace", "--expr", "1 == 1", "--config", config])
        .env("RULETRACE_MODE", "none")
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output)["mode"], "none");

    let output = ruletrace(&["trace", "--expr", "1 == 1", "--config", config, "--mode", "atomic-failures-only"])
        .env("RULETRACE_MODE", "none")
        .output()
        .unwrap();
    assert_eq!(stdout_json(&output)["mode"], "atomic_failures_only");
}

#[test]
fn unknown_config_fields_are_rejected() {
    let dir = TempDir::new().unwrap();
    let config = write(&dir, "config.json", r#"{"mode": "atomic", "colour": true}"#);
    let output = ruletrace(&["trace", "--expr", "true", "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn compile_failure_lenient_and_strict() {
    let output = ruletrace(&["trace", "--expr", "a =="]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert!(json.get("final").is_none());
    assert!(json["chunks"][0]["error"].is_string());

    let output = ruletrace(&["trace", "--expr", "a ==", "--strict"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output)["source"], "a ==");
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("compile failed"));
}

#[test]
fn missing_env_file_is_an_io_error() {
    let output = ruletrace(&["trace", "--expr", "true", "--env", "/nonexistent/env.json"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

// ---------------------------------------------------------------------------
// Other subcommands
// ---------------------------------------------------------------------------

#[test]
fn atoms_lists_fingerprints() {
    let output = ruletrace(&["atoms", "--expr", "a > 1 || b in [2, 1]"]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json[0]["expr"], "a > 1");
    assert_eq!(json[1]["expr"], "b in [1, 2]");
    assert_eq!(json[1]["fingerprint"].as_str().unwrap().len(), 32);
}

#[test]
fn fingerprint_prints_hex() {
    let output = ruletrace(&["fingerprint", "abc"]).output().unwrap();
    // sha1("abc") = a9993e364706816aba3e25717850c26c9cd0d89d
    assert_eq!(String::from_utf8(output.stdout).unwrap().trim(), "a9993e364706816aba3e25717850c26c");
}

#[test]
fn validate_reports_shared_ids_in_strict_mode() {
    let dir = TempDir::new().unwrap();
    let specs = write(&dir, "specs.json", r#"{"aa": {"id": "c"}, "bb": {"id": "c"}}"#);
    let specs = specs.to_str().unwrap();

    let output = ruletrace(&["validate", "--specs", specs]).output().unwrap();
    assert!(output.status.success());

    let output = ruletrace(&["validate", "--specs", specs, "--strict"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn playground_traces_demo_rule() {
    let output = ruletrace(&["playground"]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["final"], Value::Bool(true));
    assert_eq!(json["chunks"][0]["id"], "c_group");
    assert_eq!(json["chunks"][0]["reason"], "GROUP_ALLOWED");
    assert_eq!(json["chunks"][1]["skipped"], Value::Bool(true));
}
