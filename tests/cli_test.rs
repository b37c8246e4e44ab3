//! End-to-end tests of the `tuning-ledger` binary with a shell engine
#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

use tuning_ledger::device::DeviceLock;

const ENGINE: &str = r#"printf '{"results":[{"block_size_x":32,"time":4.0},{"block_size_x":64,"time":2.0}],"env":{"strategy":"%s"}}' "$TUNING_STRATEGY""#;

fn write_config(dir: &Path, engine: &str) -> std::path::PathBuf {
    let config = serde_json::json!({
        "algorithms": [
            {"name": "gemm", "total_ops": 8.0, "unit": "GFLOP/s",
             "command": ["sh", "-c", engine]},
            {"name": "pnpoly", "total_ops": 20.0, "unit": "MPoints/s",
             "needs_context": true, "command": ["sh", "-c", engine]}
        ],
        "strategies": [
            {"name": "brute_force", "deterministic": true},
            {"name": "pso", "repetitions": 3}
        ]
    });
    let path = dir.join("registry.json");
    fs::write(&path, serde_json::to_vec_pretty(&config).unwrap()).unwrap();
    path
}

fn ledger(dir: &Path, config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tuning-ledger"))
        .arg("--root")
        .arg(dir)
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

#[test]
fn test_run_writes_trials_and_summary() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), ENGINE);

    let out = ledger(dir.path(), &config, &["run", "gemm", "pso"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));

    for rep in 0..3 {
        assert!(dir.path().join(format!("gemm/gemm_pso_{rep}.json")).is_file());
    }
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("block_size_x=64 4000 GFLOP/s"));
    assert!(stdout.contains("3 completed, 0 skipped, 0 failed"));

    let out = ledger(dir.path(), &config, &["run", "gemm", "pso"]);
    assert!(String::from_utf8_lossy(&out.stdout).contains("0 completed, 3 skipped"));
}

#[test]
fn test_unknown_names_fail_fast() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), ENGINE);

    let out = ledger(dir.path(), &config, &["run", "fft", "pso"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown algorithm 'fft'"));

    let out = ledger(dir.path(), &config, &["run", "gemm", "tabu"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(!dir.path().join("gemm").exists());
}

#[test]
fn test_failing_engine_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "exit 1");

    let out = ledger(dir.path(), &config, &["run", "gemm", "brute_force"]);
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("gemm_brute_force.json"));
    assert!(stdout.contains("no summary database for gemm yet"));
    assert!(!dir.path().join("gemm/gemm_brute_force.json").exists());
}

#[test]
fn test_context_is_released_after_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), ENGINE);
    let lock = dir.path().join(".device.lock");

    let out = ledger(dir.path(), &config, &["run", "pnpoly", "brute_force"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    DeviceLock::acquire(&lock).unwrap();
}

#[test]
fn test_held_context_makes_run_busy() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), ENGINE);
    let _held = DeviceLock::acquire(dir.path().join(".device.lock")).unwrap();

    let out = ledger(dir.path(), &config, &["run", "pnpoly", "pso"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("device context busy"));
    assert!(!dir.path().join("pnpoly/pnpoly_pso_0.json").exists());
}

#[test]
fn test_killed_run_can_be_resumed() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), "sleep 5");
    let lock = dir.path().join(".device.lock");

    let mut child = Command::new(env!("CARGO_BIN_EXE_tuning-ledger"))
        .arg("--root")
        .arg(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["run", "pnpoly", "pso"])
        .env("RUST_LOG", "warn")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // Wait until the run has taken the device
    let holder = child.id().to_string();
    let deadline = Instant::now() + Duration::from_secs(10);
    while !fs::read_to_string(&lock).is_ok_and(|pid| pid.trim() == holder) {
        assert!(Instant::now() < deadline, "run never took the device lock");
        std::thread::sleep(Duration::from_millis(20));
    }

    // SIGKILL: no unwinding, the guard never runs
    child.kill().unwrap();
    child.wait().unwrap();
    assert!(lock.exists());

    let config = write_config(dir.path(), ENGINE);
    let out = ledger(dir.path(), &config, &["run", "pnpoly", "pso"]);
    assert_eq!(out.status.code(), Some(0), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(String::from_utf8_lossy(&out.stdout).contains("3 completed, 0 skipped, 0 failed"));
}

#[test]
fn test_pending_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(dir.path(), ENGINE);

    let out = ledger(dir.path(), &config, &["pending", "gemm", "pso"]);
    assert_eq!(String::from_utf8_lossy(&out.stdout).lines().count(), 3);

    let out = ledger(dir.path(), &config, &["report", "gemm"]);
    assert!(String::from_utf8_lossy(&out.stdout).contains("no summary database"));

    ledger(dir.path(), &config, &["run", "gemm", "brute_force"]);
    let out = ledger(dir.path(), &config, &["report", "gemm"]);
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("brute_force"));
    assert!(stdout.contains("4000.00"));
}
