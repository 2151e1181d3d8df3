//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `actionspec` binary and verify exit codes,
//! stdout content, and stderr content. Spec and input files are written to
//! a temporary directory per test.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn actionspec() -> Command {
    cargo_bin_cmd!("actionspec")
}

/// Helper: write `content` to `name` inside `dir` and return the path.
fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("write temp file");
    path
}

const POINT_SPEC: &str = "\
# A point
struct Point
    int x
    optional int y
    optional date when
";

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    actionspec()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Action spec language toolchain"));
}

#[test]
fn version_exits_0() {
    actionspec()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("actionspec"));
}

#[test]
fn check_requires_a_file() {
    actionspec().arg("check").assert().failure();
}

// ──────────────────────────────────────────────
// 2. Check subcommand
// ──────────────────────────────────────────────

#[test]
fn check_valid_file_exits_0() {
    let dir = TempDir::new().unwrap();
    let spec = write(&dir, "point.spec", POINT_SPEC);
    actionspec()
        .arg("check")
        .arg(&spec)
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: 1 types, 0 actions"));
}

#[test]
fn check_quiet_prints_nothing() {
    let dir = TempDir::new().unwrap();
    let spec = write(&dir, "point.spec", POINT_SPEC);
    actionspec()
        .args(["--quiet", "check"])
        .arg(&spec)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn check_reports_every_diagnostic() {
    let dir = TempDir::new().unwrap();
    let spec = write(
        &dir,
        "bad.spec",
        "struct A\n    Foo a\n\nstruct B\n    int b\n    string b\n",
    );
    actionspec()
        .arg("check")
        .arg(&spec)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            ":6: error: Redefinition of member 'b'",
        ))
        .stderr(predicate::str::contains(
            ":2: error: Unknown member type 'Foo'",
        ));
}

#[test]
fn check_json_output_lists_diagnostics() {
    let dir = TempDir::new().unwrap();
    let spec = write(&dir, "bad.spec", "struct A\n    Foo a\n");
    let out = actionspec()
        .args(["--output", "json", "check"])
        .arg(&spec)
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let diagnostics: serde_json::Value = serde_json::from_slice(&out).expect("JSON array");
    let list = diagnostics.as_array().expect("array");
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["line"], 2);
    assert_eq!(list[0]["message"], "Unknown member type 'Foo'");
    assert!(list[0]["file"].as_str().unwrap().ends_with("bad.spec"));
}

#[test]
fn check_json_output_is_empty_on_success() {
    let dir = TempDir::new().unwrap();
    let spec = write(&dir, "point.spec", POINT_SPEC);
    actionspec()
        .args(["--output", "json", "check"])
        .arg(&spec)
        .assert()
        .success()
        .stdout(predicate::str::diff("[]\n"));
}

#[test]
fn check_files_share_one_registry() {
    let dir = TempDir::new().unwrap();
    let base = write(&dir, "base.spec", "struct Base\n    int a\n");
    let derived = write(
        &dir,
        "derived.spec",
        "struct Derived (Base)\n    int b\n\naction get\n    input (Derived)\n",
    );
    actionspec()
        .arg("check")
        .arg(&base)
        .arg(&derived)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 actions"));
}

#[test]
fn check_missing_file_exits_1() {
    actionspec()
        .args(["check", "/nonexistent/missing.spec"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error reading file"));
}

// ──────────────────────────────────────────────
// 3. Validate subcommand
// ──────────────────────────────────────────────

#[test]
fn validate_json_input_file() {
    let dir = TempDir::new().unwrap();
    let spec = write(&dir, "point.spec", POINT_SPEC);
    let input = write(&dir, "in.json", r#"{"x": 1.0, "when": "2024-02-29"}"#);
    actionspec()
        .arg("validate")
        .arg(&spec)
        .arg("Point")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::diff("{\"when\":\"2024-02-29\",\"x\":1}\n"));
}

#[test]
fn validate_query_string_from_stdin() {
    let dir = TempDir::new().unwrap();
    let spec = write(&dir, "point.spec", POINT_SPEC);
    actionspec()
        .args(["validate", "--mode", "query-string"])
        .arg(&spec)
        .arg("Point")
        .write_stdin("x=7&y=-2\n")
        .assert()
        .success()
        .stdout(predicate::str::diff("{\"x\":7,\"y\":-2}\n"));
}

#[test]
fn validate_default_mode_does_not_coerce() {
    let dir = TempDir::new().unwrap();
    let spec = write(&dir, "point.spec", POINT_SPEC);
    actionspec()
        .args(["validate", "--mode", "default"])
        .arg(&spec)
        .arg("Point")
        .write_stdin(r#"{"x": "7"}"#)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Invalid value '7' (type 'string') for member 'x', expected type 'int'",
        ));
}

#[test]
fn validate_json_output_mode_accepts_plain_json_dates() {
    let dir = TempDir::new().unwrap();
    let spec = write(&dir, "point.spec", POINT_SPEC);
    actionspec()
        .args(["validate", "--mode", "json-output"])
        .arg(&spec)
        .arg("Point")
        .write_stdin(r#"{"x": 1, "when": "2024-02-29"}"#)
        .assert()
        .success()
        .stdout(predicate::str::diff("{\"when\":\"2024-02-29\",\"x\":1}\n"));

    actionspec()
        .args(["validate", "--mode", "json-output"])
        .arg(&spec)
        .arg("Point")
        .write_stdin(r#"{"x": 1, "when": "2024-02-30"}"#)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("for member 'when'"));
}

#[test]
fn validate_json_output_reports_member() {
    let dir = TempDir::new().unwrap();
    let spec = write(&dir, "point.spec", POINT_SPEC);
    let out = actionspec()
        .args(["--output", "json", "validate"])
        .arg(&spec)
        .arg("Point")
        .write_stdin(r#"{"y": 1}"#)
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).expect("JSON report");
    assert_eq!(report["valid"], false);
    assert_eq!(report["message"], "Required member 'x' missing");
    assert_eq!(report["member"], "x");
}

#[test]
fn validate_unknown_type_exits_1() {
    let dir = TempDir::new().unwrap();
    let spec = write(&dir, "point.spec", POINT_SPEC);
    actionspec()
        .arg("validate")
        .arg(&spec)
        .arg("Nope")
        .write_stdin("{}")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown type 'Nope'"));
}

#[test]
fn validate_invalid_spec_exits_1() {
    let dir = TempDir::new().unwrap();
    let spec = write(&dir, "bad.spec", "struct\n");
    actionspec()
        .arg("validate")
        .arg(&spec)
        .arg("Point")
        .write_stdin("{}")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(":1: error: Syntax error"));
}

// ──────────────────────────────────────────────
// 4. Query subcommand
// ──────────────────────────────────────────────

#[test]
fn query_encode_sorts_pairs() {
    actionspec()
        .args(["query", "encode", r#"{"b": {"c": null}, "a": [1, "x y"]}"#])
        .assert()
        .success()
        .stdout(predicate::str::diff("a.0=1&a.1=x%20y&b.c=null\n"));
}

#[test]
fn query_decode_builds_nested_values() {
    actionspec()
        .args(["query", "decode", "?a.0=x&b.c=1"])
        .assert()
        .success()
        .stdout(predicate::str::diff("{\"a\":[\"x\"],\"b\":{\"c\":\"1\"}}\n"));
}

#[test]
fn query_decode_duplicate_key_exits_1() {
    actionspec()
        .args(["query", "decode", "a=1&a=2"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Duplicate key 'a=2'"));
}

#[test]
fn query_encode_invalid_json_exits_1() {
    actionspec()
        .args(["--output", "json", "query", "encode", "{"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("\"error\""));
}
