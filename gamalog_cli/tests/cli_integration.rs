use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Config pointing at a missing image and a tool that does not exist
fn write_config(dir: &tempfile::TempDir, extra: &str) -> PathBuf {
    let toml = format!(
        r#"
[image]
path = "{img}"
mtype = "/nonexistent/bin/mtype"
mcopy = "/nonexistent/bin/mcopy"
timeout_ms = 2000

[rotation]
lock_path = "{lock}"

{extra}
"#,
        img = dir.path().join("missing.bin").display(),
        lock = dir.path().join("rotate.lock").display(),
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["rotate"], 3, "LogReadError", "stderr")]
#[case(&["tail", "--once"], 0, "ReadFailed", "stdout")]
#[case(&["tail", "--interval-ms", "0"], 1, "interval-ms", "stderr")]
#[case(&["simulate", "--count", "1"], 4, "mtools", "stderr")]
#[case(&["self-check"], 1, "image", "stderr")]
#[case(&["health"], 1, "degraded", "stdout")]
#[case(&["bogus"], 2, "unrecognized", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");

    let mut cmd = Command::cargo_bin("gamalog").unwrap();
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
#[case("[tailer]\ninterval_ms = 0", "tailer.interval_ms")]
#[case("[image]\ntimeout_ms = 0", "image.timeout_ms")]
#[case("[machine]\ntimezone = \"Mars/Olympus\"", "machine.timezone")]
fn invalid_config_is_rejected(#[case] body: &str, #[case] key: &str) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, body).unwrap();

    Command::cargo_bin("gamalog")
        .unwrap()
        .arg("--config")
        .arg(&path)
        .arg("health")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Configuration is invalid"))
        .stderr(predicate::str::contains(key));
}

#[test]
fn missing_config_file_is_explained() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("gamalog")
        .unwrap()
        .arg("--config")
        .arg(dir.path().join("nope.toml"))
        .arg("rotate")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not read the config file"));
}

#[test]
fn json_mode_prints_rotation_result_object() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = Command::cargo_bin("gamalog")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("rotate")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["result"], "LogReadError");
    assert!(v["message"].as_str().unwrap().contains("mtype"));
}

#[test]
fn json_mode_prints_structured_errors() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "");
    let out = Command::cargo_bin("gamalog")
        .unwrap()
        .arg("--config")
        .arg(&cfg)
        .arg("--json")
        .arg("--log-level")
        .arg("off")
        .arg("simulate")
        .arg("--count")
        .arg("1")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let last = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "ToolMissing");
    assert!(v["message"].as_str().unwrap().contains("mtype"));
}
