//! Command line behavior

use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_microtask-promise"))
}

#[test]
fn test_config_prints_effective_toml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[queue]\ncapacity = 32\n").unwrap();

    let output = binary()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .output()
        .expect("Failed to run binary");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("capacity = 32"), "stdout: {}", stdout);
    assert!(stdout.contains("cache_small_values = true"), "stdout: {}", stdout);
}

#[test]
fn test_config_write_round_trips() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("out").join("config.toml");

    let status = binary()
        .arg("config")
        .arg("--write")
        .arg(&target)
        .env("MICROTASK_PROMISE_CONFIG", dir.path().join("missing.toml"))
        .status()
        .expect("Failed to run binary");
    assert!(!status.success(), "a missing config named by the environment must fail");

    let status = binary()
        .arg("config")
        .arg("--write")
        .arg(&target)
        .env_remove("MICROTASK_PROMISE_CONFIG")
        .env("XDG_CONFIG_HOME", dir.path())
        .status()
        .expect("Failed to run binary");
    assert!(status.success());
    assert!(fs::read_to_string(&target).unwrap().contains("[queue]"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[queue]\ncapacity = 0\n").unwrap();

    let output = binary()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .output()
        .expect("Failed to run binary");
    assert!(!output.status.success());
}

#[test]
fn test_demo_scenarios_run() {
    let dir = tempdir().unwrap();
    let output = binary()
        .args(["demo", "ordering"])
        .env_remove("MICROTASK_PROMISE_CONFIG")
        .env("XDG_CONFIG_HOME", dir.path())
        .output()
        .expect("Failed to run binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let sync = stdout.find("synchronous code done").unwrap();
    let first = stdout.find("first: settled").unwrap();
    assert!(sync < first, "stdout: {}", stdout);
}

#[test]
fn test_stress_runs() {
    let dir = tempdir().unwrap();
    let output = binary()
        .args(["stress", "--tasks", "5000"])
        .env_remove("MICROTASK_PROMISE_CONFIG")
        .env("XDG_CONFIG_HOME", dir.path())
        .output()
        .expect("Failed to run binary");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("ran 5000 tasks"));
}
