use std::fs;

use rstest::rstest;
use tempfile::tempdir;
use wattguard_config::{ReplayRow, load_replay_csv, load_replay_file};

fn write(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("replay.csv");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn loads_plain_voltage_current_rows() {
    let dir = tempdir().unwrap();
    let path = write(&dir, "voltage,current\n12.0,0.5\n12.1,0.52\n");
    let rows = load_replay_csv(&path).expect("load");
    assert_eq!(
        rows,
        vec![
            ReplayRow { voltage: 12.0, current: 0.5 },
            ReplayRow { voltage: 12.1, current: 0.52 },
        ]
    );
}

#[test]
fn accepts_captured_telemetry_log() {
    let dir = tempdir().unwrap();
    let body = "\
timestamp,voltage,current,power,predicted_current,predicted_power,relay_state,baseline_current,baseline_power,baseline_voltage
1000,12.000,0.5000,6.0000,0.5010,6.0100,ON,0.0000,0.0000,0.0000
2000,12.010,0.5010,6.0170,0.4990,6.0010,ON,0.0000,0.0000,0.0000
";
    let path = write(&dir, body);
    let rows = load_replay_csv(&path).expect("load");
    assert_eq!(rows.len(), 2);
    assert!((rows[1].current - 0.501).abs() < 1e-6);
}

#[rstest]
#[case("volts,amps\n12.0,0.5\n", "must have 'voltage' and 'current' headers")]
#[case("voltage,current\n", "no data rows")]
#[case("voltage,current\n12.0,abc\n", "invalid CSV row 2")]
#[case("voltage,current\n12.0,0.5\nNaN,0.5\n", "invalid CSV row 3")]
fn rejects_bad_files(#[case] body: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let path = write(&dir, body);
    let err = load_replay_csv(&path).expect_err("should fail");
    assert!(
        format!("{err}").contains(needle),
        "error `{err}` should contain `{needle}`"
    );
}

#[test]
fn missing_file_is_reported() {
    let dir = tempdir().unwrap();
    let err = load_replay_csv(&dir.path().join("nope.csv")).expect_err("should fail");
    assert!(format!("{err}").contains("open replay CSV"));
}

#[test]
fn telemetry_log_with_comment_lines_loads() {
    let dir = tempdir().unwrap();
    let body = "\
timestamp,voltage,current,power,predicted_current,predicted_power,relay_state,baseline_current,baseline_power,baseline_voltage
0,12.000,0.5000,6.0000,0.5010,6.0100,ON,0.0000,0.0000,0.0000
# done: ticks=1 latches=0 skipped_reads=0 ended=MaxTicks
";
    let path = write(&dir, body);
    assert_eq!(load_replay_file(&path).expect("load"), vec![ReplayRow { voltage: 12.0, current: 0.5 }]);
}

#[rstest]
#[case("1000,12.0,0.5,6.0,0.51,6.1\n2000,12.1,0.6,7.26,0.6,7.2\n", 2)]
#[case("12.0,0.5,6.0,0.51\n", 1)]
#[case("12.0,0.5,6.0,x\n", 1)]
#[case("\n# boot\n1000,12.0,0.5,6.0,0.51,6.1\ngarbage\n12.0,0.5\n", 1)]
fn headerless_device_lines(#[case] body: &str, #[case] expected: usize) {
    let dir = tempdir().unwrap();
    let rows = load_replay_file(&write(&dir, body)).expect("load");
    assert_eq!(rows.len(), expected);
    assert_eq!(rows[0], ReplayRow { voltage: 12.0, current: 0.5 });
}

#[test]
fn monitor_json_output_replays() {
    let dir = tempdir().unwrap();
    let body = r#"{"timestamp":0,"voltage":12.0,"current":0.5,"power":6.0,"relay_state":"ON","type":"sample"}
{"command":"STATUS","kind":"info","lines":["relay=ON"],"type":"response"}
{"timestamp":1000,"voltage":12.5,"current":0.25,"power":3.125,"relay_state":"ON","type":"sample"}
{"type":"summary","ticks":2,"latches":0,"skipped_reads":0,"ended":"MaxTicks"}
"#;
    let rows = load_replay_file(&write(&dir, body)).expect("load");
    assert_eq!(
        rows,
        vec![
            ReplayRow { voltage: 12.0, current: 0.5 },
            ReplayRow { voltage: 12.5, current: 0.25 },
        ]
    );
}

#[test]
fn loose_json_records_from_firmware() {
    let dir = tempdir().unwrap();
    let body = "{Voltage: 12.0, Current: '0.5', Power: 6.0}\n{\"VOLTAGE\": \"11.5\", \"current\": 1}\n";
    let rows = load_replay_file(&write(&dir, body)).expect("load");
    assert_eq!(
        rows,
        vec![
            ReplayRow { voltage: 12.0, current: 0.5 },
            ReplayRow { voltage: 11.5, current: 1.0 },
        ]
    );
}

#[rstest]
#[case("volts,amps\n12.0,0.5\n", "must have 'voltage' and 'current' headers")]
#[case("{\"type\":\"summary\",\"ticks\":0}\n", "no readable rows")]
#[case("1,2\n3,4\n", "no readable rows")]
#[case("# only comments\n", "no readable rows")]
fn replay_file_rejects_unreadable_input(#[case] body: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let err = load_replay_file(&write(&dir, body)).expect_err("should fail");
    assert!(
        format!("{err}").contains(needle),
        "error `{err}` should contain `{needle}`"
    );
}
