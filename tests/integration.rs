//! Integration tests for the cecd binary
//!
//! These run without CEC hardware: adapter discovery is pointed at an empty
//! directory, so the daemon reports the missing adapter and exits.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Get the path to the cecd binary
fn cecd_bin() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_cecd"))
}

/// Run cecd with all sinks redirected into `dir`
fn run_in(dir: &Path, pid: &Path, extra: &[&str]) -> Output {
    let input = dir.join("input");
    if !input.exists() {
        fs::write(&input, "status\nquit\n").expect("Failed to write input file");
    }

    Command::new(cecd_bin())
        .env_remove("RUST_LOG")
        .arg("--dev-dir")
        .arg(dir.join("dev"))
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(dir.join("out"))
        .arg("-e")
        .arg(dir.join("err"))
        .arg("-s")
        .arg(dir.join("status"))
        .arg("-p")
        .arg(pid)
        .args(extra)
        .output()
        .expect("Failed to execute cecd")
}

#[test]
fn test_help_command() {
    let output = Command::new(cecd_bin())
        .arg("--help")
        .output()
        .expect("Failed to execute cecd --help");

    assert!(output.status.success(), "cecd --help should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CEC Daemon"), "Help should contain description");
    for flag in ["--input", "--output", "--error", "--status", "--pid", "--device"] {
        assert!(stdout.contains(flag), "Help should mention {}", flag);
    }
    assert!(!stdout.contains("--dev-dir"), "--dev-dir should be hidden");
}

#[test]
fn test_invalid_flag() {
    let output = Command::new(cecd_bin())
        .arg("--frobnicate")
        .output()
        .expect("Failed to execute cecd");

    assert!(!output.status.success(), "Unknown flag should fail");
    assert_eq!(output.status.code(), Some(2), "Usage errors exit with code 2");
}

#[test]
fn test_invalid_device() {
    let output = Command::new(cecd_bin())
        .args(["--device", "toaster"])
        .output()
        .expect("Failed to execute cecd");

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_no_adapters_found() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("dev")).unwrap();

    let output = run_in(dir.path(), &dir.path().join("cecd.pid"), &[]);
    assert!(output.status.success(), "Missing adapter is not an error");

    let out = fs::read_to_string(dir.path().join("out")).unwrap();
    assert_eq!(out, "No adapters found\n");
    assert!(!dir.path().join("status").exists());
    assert!(!dir.path().join("cecd.pid").exists(), "PID file should be removed");

    let err = fs::read_to_string(dir.path().join("err")).unwrap();
    assert!(err.contains("CEC adapter driver loaded"), "err: {}", err);
}

#[test]
fn test_open_failure_reported() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("dev")).unwrap();
    let missing = dir.path().join("dev").join("cec0");

    let output = run_in(
        dir.path(),
        &dir.path().join("cecd.pid"),
        &["--adapter", missing.to_str().unwrap()],
    );
    assert!(output.status.success(), "Open failure is not an error");

    let out = fs::read_to_string(dir.path().join("out")).unwrap();
    assert_eq!(out, "Failed to open a connection to the CEC adapter\n");
    assert!(!dir.path().join("cecd.pid").exists(), "PID file should be removed");
}

#[test]
fn test_unwritable_pid_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("dev")).unwrap();

    let output = run_in(dir.path(), Path::new("/nonexistent/cecd-test/cecd.pid"), &[]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("PID"), "stderr: {}", stderr);
}
