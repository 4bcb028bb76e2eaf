//! Argument parsing, help output and error reporting.

#![allow(clippy::expect_used)]

use std::io::Write as _;

use assert_cmd::Command;
use predicates::prelude::*;

pub fn ndt_ops() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ndt-ops"));
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("NDT_OPS_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn config_file(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp config");
    file.write_all(yaml.as_bytes()).expect("write config");
    file
}

#[test]
fn test_no_args_shows_help_and_exits_two() {
    ndt_ops()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_help_lists_every_command() {
    ndt_ops()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("stop"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("health"));
}

#[test]
fn test_version_flag() {
    ndt_ops()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ndt-ops"));
}

#[test]
fn test_unknown_command_is_rejected() {
    ndt_ops()
        .arg("deploy")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_missing_explicit_config_fails() {
    ndt_ops()
        .args(["--config", "/nonexistent/ops.yaml", "provision", "--dry-run"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_invalid_config_json_error_object() {
    let cfg = config_file("api:\n  workers: 0\n");
    let output = ndt_ops()
        .arg("--json")
        .arg("--config")
        .arg(cfg.path())
        .arg("status")
        .output()
        .expect("run ndt-ops");

    assert_eq!(output.status.code(), Some(1));
    let doc: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is one JSON document");
    assert_eq!(doc["error"], true);
    assert_eq!(doc["code"], "invalid_config");
    assert!(
        doc["message"]
            .as_str()
            .is_some_and(|m| m.contains("worker count"))
    );
}

#[test]
fn test_unparseable_config_is_invalid_config() {
    let cfg = config_file("api: [this is not a mapping\n");
    ndt_ops()
        .args(["--json", "--config"])
        .arg(cfg.path())
        .arg("health")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("\"invalid_config\""));
}

#[test]
fn test_config_path_from_environment() {
    let cfg = config_file("thresholds:\n  cpu: 150\n");
    ndt_ops()
        .env("NDT_OPS_CONFIG", cfg.path())
        .arg("status")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("thresholds.cpu"));
}

#[test]
fn test_no_color_environment_value_is_accepted() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let cfg = config_file(&format!(
        "service:\n  artifact_dir: {}\n\
         metadata:\n  endpoint: http://127.0.0.1:9/latest\n  timeout_ms: 200\n",
        tmp.path().join("out").display()
    ));
    for value in ["1", "true", "yes"] {
        ndt_ops()
            .env("NO_COLOR", value)
            .arg("--config")
            .arg(cfg.path())
            .args(["provision", "--dry-run"])
            .assert()
            .success();
    }
}
