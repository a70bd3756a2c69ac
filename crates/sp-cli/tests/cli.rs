//! Integration tests for the StagePhase CLI

use assert_cmd::Command;
use pretty_assertions::assert_eq;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LOG_CALLS: &str = r#"
template method log_calls(compile prefix) {
    var n = meta.compile_time(0);
    if (meta.target.parameter_count > 0) { n = meta.compile_time(1); }
    log($"{prefix}: {n}");
    meta.proceed();
}
"#;

const AMBIGUOUS: &str =
    "template method bad() { var x = 0; x = meta.compile_time(1); x = read(); }";

const DECLS: &str = r#"[
    {"path": "log", "kind": "Method"},
    {"path": "read", "kind": "Method"}
]"#;

const SITE: &str = r#"{
    "target": {
        "name": "transfer",
        "return_type": "bool",
        "parameters": [{"name": "from", "type_name": "Account"}]
    },
    "arguments": {"prefix": "enter"},
    "proceed": "{ work(); }"
}"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn sp() -> Command {
    Command::cargo_bin("sp").unwrap()
}

#[test]
fn test_cli_help() {
    sp().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("StagePhase"));
}

#[test]
fn test_cli_version() {
    sp().arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_check_accepts_template() {
    let temp_dir = TempDir::new().unwrap();
    let template = write(temp_dir.path(), "log_calls.sp", LOG_CALLS);
    let decls = write(temp_dir.path(), "decls.json", DECLS);

    sp().arg("check")
        .arg(&template)
        .arg("--decls")
        .arg(&decls)
        .assert()
        .success()
        .stdout(predicate::str::contains("`log_calls`"))
        .stdout(predicate::str::contains("0 warning(s)"));
}

#[test]
fn test_check_prints_generator() {
    let temp_dir = TempDir::new().unwrap();
    let template = write(temp_dir.path(), "log_calls.sp", LOG_CALLS);
    let decls = write(temp_dir.path(), "decls.json", DECLS);

    sp().args(["check", "--generator"])
        .arg(&template)
        .arg("--decls")
        .arg(&decls)
        .assert()
        .success()
        .stdout(predicate::str::contains("prefix"));
}

#[test]
fn test_check_rejects_ambiguous_local() {
    let temp_dir = TempDir::new().unwrap();
    let template = write(temp_dir.path(), "bad.sp", AMBIGUOUS);
    let decls = write(temp_dir.path(), "decls.json", DECLS);

    sp().arg("check")
        .arg(&template)
        .arg("--decls")
        .arg(&decls)
        .args(["--diagnostics", "plain"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("SP0110"))
        .stderr(predicate::str::contains("ERROR"))
        .stderr(predicate::str::contains("template `bad` has"));
}

#[test]
fn test_check_reports_parse_errors() {
    let temp_dir = TempDir::new().unwrap();
    let template = write(temp_dir.path(), "broken.sp", "template method broken( {");

    sp().arg("check")
        .arg(&template)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("broken.sp"));
}

#[test]
fn test_missing_template_file() {
    sp().args(["check", "does-not-exist.sp"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.sp"));
}

#[test]
fn test_expand_prints_residual_code() {
    let temp_dir = TempDir::new().unwrap();
    let template = write(temp_dir.path(), "log_calls.sp", LOG_CALLS);
    let decls = write(temp_dir.path(), "decls.json", DECLS);
    let site = write(temp_dir.path(), "transfer.json", SITE);

    sp().arg("expand")
        .arg(&template)
        .arg("--decls")
        .arg(&decls)
        .arg("--site")
        .arg(&site)
        .assert()
        .success()
        .stdout(predicate::str::contains("log(\"enter: 1\");"))
        .stdout(predicate::str::contains("work();"));
}

#[test]
fn test_expand_json_output() {
    let temp_dir = TempDir::new().unwrap();
    let template = write(temp_dir.path(), "log_calls.sp", LOG_CALLS);
    let decls = write(temp_dir.path(), "decls.json", DECLS);
    let site = write(temp_dir.path(), "transfer.json", SITE);

    let output = sp()
        .arg("expand")
        .arg(&template)
        .arg("--decls")
        .arg(&decls)
        .arg("--site")
        .arg(&site)
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let residual: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(residual["provenance"]["template"], "log_calls");
    assert_eq!(residual["provenance"]["target"], "transfer");
    assert_eq!(residual["stmts"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_expand_writes_output_file() {
    let temp_dir = TempDir::new().unwrap();
    let template = write(temp_dir.path(), "log_calls.sp", LOG_CALLS);
    let decls = write(temp_dir.path(), "decls.json", DECLS);
    let site = write(temp_dir.path(), "transfer.json", SITE);
    let output = temp_dir.path().join("out.cs");

    sp().arg("expand")
        .arg(&template)
        .arg("--decls")
        .arg(&decls)
        .arg("--site")
        .arg(&site)
        .arg("--output")
        .arg(&output)
        .assert()
        .success()
        .stderr(predicate::str::contains("wrote 2 statement(s)"));

    let written = fs::read_to_string(&output).unwrap();
    assert_eq!(written, "log(\"enter: 1\");\n{\n    work();\n}\n");
}

#[test]
fn test_strict_flag_changes_classification() {
    let temp_dir = TempDir::new().unwrap();
    let template = write(
        temp_dir.path(),
        "unknown.sp",
        "template method unknown() { var n = meta.compile_time(1); missing(n); }",
    );
    let decls = write(temp_dir.path(), "decls.json", DECLS);

    sp().arg("check")
        .arg(&template)
        .arg("--decls")
        .arg(&decls)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 emitting statement(s)"));

    sp().arg("--strict")
        .arg("check")
        .arg(&template)
        .arg("--decls")
        .arg(&decls)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 emitting statement(s)"));
}

#[test]
fn test_config_file_is_validated() {
    let temp_dir = TempDir::new().unwrap();
    let template = write(temp_dir.path(), "log_calls.sp", LOG_CALLS);
    let config = write(temp_dir.path(), "engine.json", r#"{"max_meta_iterations": 0}"#);

    sp().arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&template)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}
