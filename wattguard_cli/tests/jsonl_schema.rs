use assert_cmd::Command;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[pins]
relay = 17

[sampling]
period_ms = 2

[prediction]
seed = 11
jitter_pct = 0.0
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("not JSON ({e}): {l}")))
        .collect()
}

/// Every stdout line in --json mode is a typed JSON object.
#[rstest]
fn jsonl_run_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("wattguard")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--max-ticks", "5"])
        .output()
        .unwrap();
    assert!(out.status.success());

    let lines = json_lines(&out.stdout);
    let samples: Vec<_> = lines.iter().filter(|v| v["type"] == "sample").collect();
    assert_eq!(samples.len(), 5);

    let first = samples[0];
    for key in [
        "timestamp",
        "voltage",
        "current",
        "power",
        "predicted_current",
        "predicted_power",
        "relay_state",
        "baseline_current",
        "baseline_power",
        "baseline_voltage",
    ] {
        assert!(first.get(key).is_some(), "missing {key}: {first}");
    }
    assert_eq!(first["relay_state"], "ON");
    assert_eq!(first["baseline_current"], 0.0);
    // Zero jitter predicts the measurement itself.
    assert_eq!(first["predicted_current"], first["current"]);

    let summary = lines.last().unwrap();
    assert_eq!(summary["type"], "summary");
    assert_eq!(summary["ticks"], 5);
    assert_eq!(summary["latches"], 0);
}

#[rstest]
fn jsonl_responses_are_tagged() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("wattguard")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(["run", "--max-ticks", "60", "--period-ms", "5"])
        .write_stdin("TOGGLE\nnope\n")
        .output()
        .unwrap();
    assert!(out.status.success());

    let lines = json_lines(&out.stdout);
    let responses: Vec<_> = lines.iter().filter(|v| v["type"] == "response").collect();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["command"], "TOGGLE");
    assert_eq!(responses[0]["kind"], "ack");
    assert_eq!(responses[1]["kind"], "unknown");
    assert!(responses[1]["command"].is_null());
}

#[rstest]
fn jsonl_error_object_on_sensor_failure() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("wattguard")
        .unwrap()
        .env_remove("RUST_LOG")
        .env("WATTGUARD_SIM_FAIL_INIT", "1")
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));

    let lines = json_lines(&out.stdout);
    let err = lines.last().unwrap();
    assert_eq!(err["type"], "error");
    assert_eq!(err["reason"], "SensorInit");
    assert_eq!(err["exit_code"], 3);
}

#[rstest]
fn jsonl_self_check() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("wattguard")
        .unwrap()
        .env_remove("RUST_LOG")
        .arg("--json")
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .output()
        .unwrap();
    assert!(out.status.success());

    let lines = json_lines(&out.stdout);
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["type"], "self_check");
    assert_eq!(lines[0]["ok"], true);
    assert_eq!(lines[0]["relay_state"], "ON");
}
