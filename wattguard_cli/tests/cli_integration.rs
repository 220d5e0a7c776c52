use assert_cmd::Command;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::tempdir;

const HEADER: &str = "timestamp,voltage,current,power,predicted_current,predicted_power,relay_state,baseline_current,baseline_power,baseline_voltage";

// Minimal config: only [pins] is required, short period keeps runs fast.
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[pins]
# unused by the simulated backend but must be present
relay = 17

[sampling]
period_ms = 2

[prediction]
seed = 7
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn wattguard(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("wattguard").unwrap();
    cmd.env_remove("RUST_LOG");
    for key in [
        "WATTGUARD_SIM_VOLTAGE",
        "WATTGUARD_SIM_CURRENT",
        "WATTGUARD_SIM_NOISE",
        "WATTGUARD_SIM_STEP_AT",
        "WATTGUARD_SIM_STEP_CURRENT",
        "WATTGUARD_SIM_FAIL_INIT",
        "WATTGUARD_SIM_RELAY_FAULT",
    ] {
        cmd.env_remove(key);
    }
    cmd.arg("--config").arg(cfg);
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["run", "--max-ticks", "3"], 0, HEADER, "stdout")]
#[case(&["run", "--max-ticks", "3"], 0, "# done: ticks=3 latches=0", "stdout")]
#[case(&["self-check"], 0, "self-check OK: voltage=12.000 V", "stdout")]
#[case(&["replay"], 2, "required", "stderr")]
#[case(&["bogus"], 2, "unrecognized subcommand", "stderr")]
#[case(&["run", "--period-ms", "0"], 2, "invalid value '0'", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = wattguard(&cfg);
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
fn step_in_load_latches_relay_off() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = wattguard(&cfg)
        .env("WATTGUARD_SIM_STEP_AT", "20")
        .env("WATTGUARD_SIM_STEP_CURRENT", "0.6")
        .args(["run", "--max-ticks", "40"])
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let stdout = String::from_utf8(out.stdout).unwrap();
    let rows: Vec<&str> = stdout
        .lines()
        .filter(|l| !l.starts_with('#') && *l != HEADER)
        .collect();
    assert_eq!(rows.len(), 40);
    assert!(rows[0].contains(",ON,"));
    assert!(rows[39].contains(",OFF,"), "last row: {}", rows[39]);
    assert!(stdout.contains("latches=1"));
}

#[rstest]
fn stdin_commands_are_answered() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    wattguard(&cfg)
        .args(["run", "--max-ticks", "60", "--period-ms", "5"])
        .write_stdin("status\nRELAY OFF\nfrobnicate\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("relay=ON commanded=ON interrupted=no"))
        .stdout(predicate::str::contains("OK relay OFF"))
        .stdout(predicate::str::contains("ERR unknown command 'frobnicate'"));
}

#[rstest]
fn replay_history_is_printed_at_the_end() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    wattguard(&cfg)
        .args(["run", "--max-ticks", "4", "--replay-history"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# history"))
        .stdout(predicate::str::contains("# done: ticks=4"));
}

#[rstest]
fn replay_csv_runs_until_exhausted() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let csv = dir.path().join("capture.csv");
    let mut f = fs::File::create(&csv).unwrap();
    writeln!(f, "voltage,current").unwrap();
    for _ in 0..6 {
        writeln!(f, "12.0,0.5").unwrap();
    }

    wattguard(&cfg)
        .arg("replay")
        .arg("--csv")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::starts_with(HEADER))
        // The replay clock advances one period per tick.
        .stdout(predicate::str::contains("\n10,12.000,0.5000,6.0000"))
        .stdout(predicate::str::contains("ended=SourceExhausted"));
}

#[rstest]
fn json_output_replays_through_the_monitor() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = wattguard(&cfg)
        .args(["--json", "run", "--max-ticks", "5"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let capture = dir.path().join("capture.jsonl");
    fs::write(&capture, &out.stdout).unwrap();

    wattguard(&cfg)
        .arg("replay")
        .arg("--csv")
        .arg(&capture)
        .assert()
        .success()
        .stdout(predicate::str::contains("# done: ticks=5 latches=0 skipped_reads=0 ended=SourceExhausted"));
}

#[rstest]
fn replay_csv_with_bad_header_is_reported() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let csv = dir.path().join("capture.csv");
    fs::write(&csv, "volts,amps\n12.0,0.5\n").unwrap();

    wattguard(&cfg)
        .arg("replay")
        .arg("--csv")
        .arg(&csv)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("What happened"));
}

#[rstest]
#[case("WATTGUARD_SIM_FAIL_INIT", 3, "did not answer")]
#[case("WATTGUARD_SIM_RELAY_FAULT", 4, "hardware fault")]
fn hardware_failures_have_stable_exit_codes(
    #[case] key: &str,
    #[case] code: i32,
    #[case] needle: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    wattguard(&cfg)
        .env(key, "1")
        .args(["run", "--max-ticks", "2"])
        .assert()
        .code(code)
        .stderr(predicate::str::contains(needle));
}

#[rstest]
#[case("[pins]\nrelay = 17\n[baseline]\nalpha = 0.0\n", "baseline.alpha")]
#[case("[pins]\nrelay = 17\n[history]\ncapacity = 4\nshort_window = 5\n", "short_window")]
#[case("[sampling]\nperiod_ms = 10\n", "not valid TOML")]
fn bad_config_exits_with_two(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, toml).unwrap();

    wattguard(&cfg)
        .args(["run", "--max-ticks", "1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(needle));
}

#[rstest]
fn missing_config_file_is_reported() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("absent.toml");

    wattguard(&cfg)
        .arg("self-check")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Could not read the config file"));
}
