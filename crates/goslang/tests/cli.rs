// Copyright (c) Asymptotic Labs
// SPDX-License-Identifier: Apache-2.0

use std::fs;

use assert_cmd::Command;
use tempfile::tempdir;

fn goslang() -> Command {
    let mut cmd = Command::cargo_bin("goslang").unwrap();
    cmd.env_remove("GOSLANG_LOG");
    cmd
}

fn stdout_of(output: &std::process::Output) -> String {
    String::from_utf8(output.stdout.clone()).unwrap()
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8(output.stderr.clone()).unwrap()
}

#[test]
fn translates_file_argument() {
    let output = goslang()
        .arg("tests/programs/assign.go")
        .assert()
        .success()
        .get_output()
        .clone();
    let expected = goslang::parse_to_json(&fs::read_to_string("tests/programs/assign.go").unwrap());
    assert_eq!(stdout_of(&output), format!("{}\n", expected));
}

#[test]
fn reads_stdin_when_no_files() {
    let output = goslang()
        .arg("--compact")
        .write_stdin("package main\n\nfunc main() {\n\tprintln(1)\n}\n")
        .assert()
        .success()
        .get_output()
        .clone();
    let stdout = stdout_of(&output);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.starts_with(r#"{"tag":"package","decls":[{"tag":"funcDecl","name":"main""#));
}

#[test]
fn dash_means_stdin() {
    let output = goslang()
        .args(["--compact", "-"])
        .write_stdin("package main\n")
        .assert()
        .success()
        .get_output()
        .clone();
    assert_eq!(stdout_of(&output), "{\"tag\":\"package\",\"decls\":[]}\n");
}

#[test]
fn writes_output_file() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("out.json");
    goslang()
        .arg("tests/programs/factorial.go")
        .arg("--output")
        .arg(&target)
        .assert()
        .success();
    let written = fs::read_to_string(&target).unwrap();
    let value: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(value["decls"].as_array().unwrap().len(), 2);
}

#[test]
fn frontend_errors_are_reported_but_not_fatal() {
    let output = goslang()
        .arg("tests/programs/type_error.go")
        .assert()
        .success()
        .get_output()
        .clone();
    assert!(stdout_of(&output).contains("\"tag\": \"error\""));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("type error: cannot use n (variable of type int)"));
    assert!(stderr.contains("type_error.go:9:15"));
}

#[test]
fn strict_mode_fails_on_error_nodes() {
    let output = goslang()
        .args(["--strict", "tests/programs/unsupported.go"])
        .assert()
        .failure()
        .code(1)
        .get_output()
        .clone();
    assert!(stderr_of(&output).contains("strict mode: generated IR contains 4 error node(s)"));
}

#[test]
fn strict_mode_accepts_clean_programs() {
    goslang()
        .args(["--strict", "tests/programs/factorial.go"])
        .assert()
        .success();
}

#[test]
fn missing_file_exits_with_one() {
    let output = goslang()
        .arg("tests/programs/missing.go")
        .assert()
        .failure()
        .code(1)
        .get_output()
        .clone();
    assert!(stderr_of(&output).contains("failed to read tests/programs/missing.go"));
}
