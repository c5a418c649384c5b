//! Integration tests for the uart-sim CLI.

#![allow(clippy::pedantic, clippy::nursery)]

use line_harness as _;
use rstest::rstest;
use serde as _;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use uart_core as _;

fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.join("uart-sim")
}

fn create_temp_file(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

const BENCH_SCRIPT: &str = "\
; 24 MHz clock, 1 Mbaud line: 24 ticks per bit
config clk=24000000 baud=1000000

send 0xAF
expect state == full
expect buffer == 0xAF
wait 2 bits
ack

send 0x42
send 0x24           ; lands on the unread 0x42
expect state == error
expect fault == overrun
wait 1 bits
fix

send 0x24
expect buffer == 0x24
ack
wait 1
expect state == idle
";

#[test]
fn run_bench_script_passes() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = create_temp_file(temp_dir.path(), "bench.uart", BENCH_SCRIPT);

    let output = Command::new(binary_path())
        .args(["run", script.to_str().unwrap()])
        .output()
        .expect("failed to run uart-sim");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Received: [0xAF, 0x42, 0x24]"));
    assert!(stdout.contains("Fault: "));
    assert!(stdout.contains("Final state: idle"));
    assert!(stdout.contains("Expectations: 6 passed, 0 failed (total: 6)"));
}

#[test]
fn failing_expectation_exits_with_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = create_temp_file(
        temp_dir.path(),
        "fail.uart",
        "config clk=24000000 baud=1000000\nsend 0x24 stop=low\nexpect state == full\n",
    );

    let output = Command::new(binary_path())
        .args(["run", script.to_str().unwrap()])
        .output()
        .expect("failed to run uart-sim");

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("line 3: expect state == full ... FAILED (actual: error)"));
    assert!(stdout.contains("Final state: error (status 0x01, waiting for fix)"));
}

#[test]
fn parse_error_names_the_line() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = create_temp_file(temp_dir.path(), "bad.uart", "send 0xAF\nsend 300\n");

    let output = Command::new(binary_path())
        .args(["run", script.to_str().unwrap()])
        .output()
        .expect("failed to run uart-sim");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("line 2: value 300 does not fit in a byte (in 'send 300')"));
}

#[test]
fn command_line_rates_override_script_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = create_temp_file(
        temp_dir.path(),
        "rates.uart",
        "config clk=24000000 baud=1000000\nsend 0x5A\nexpect buffer == 0x5A\n",
    );

    let output = Command::new(binary_path())
        .args(["run", script.to_str().unwrap(), "--baud", "115200", "--json"])
        .output()
        .expect("failed to run uart-sim");

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["divisor"], 208);
    assert_eq!(report["received"], serde_json::json!([0x5A]));
    assert_eq!(report["final_state"], "Full");
    assert_eq!(report["results"][0]["passed"], true);
}

#[test]
fn unreachable_rate_is_a_setup_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = create_temp_file(temp_dir.path(), "slow.uart", "send 0x01\n");

    let output = Command::new(binary_path())
        .args(["run", script.to_str().unwrap(), "--clk", "1000", "--baud", "2000"])
        .output()
        .expect("failed to run uart-sim");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.starts_with("error: "));
}

#[test]
fn trace_goes_to_stderr() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = create_temp_file(
        temp_dir.path(),
        "trace.uart",
        "config clk=24000000 baud=1000000\nsend 0x01\n",
    );

    let output = Command::new(binary_path())
        .args(["run", script.to_str().unwrap(), "--trace"])
        .output()
        .expect("failed to run uart-sim");

    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("       0: idle -> start"));
    assert!(stderr.contains("     229: byte 0x01"));
    assert!(stderr.contains("     229: stop -> full"));
}

#[rstest]
#[case("24000000", "9600", "divisor: 2500")]
#[case("24000000", "1000000", "divisor: 24")]
#[case("24000000", "115200", "divisor: 208")]
fn divisor_command_prints_divisor(#[case] clk: &str, #[case] baud: &str, #[case] expected: &str) {
    let output = Command::new(binary_path())
        .args(["divisor", "--clk", clk, "--baud", baud])
        .output()
        .expect("failed to run uart-sim");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with(expected), "{stdout}");
}

#[test]
fn divisor_command_rejects_excessive_error() {
    let output = Command::new(binary_path())
        .args(["divisor", "--clk", "1000", "--baud", "300", "--max-err", "0.01"])
        .output()
        .expect("failed to run uart-sim");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.starts_with("error: "));
}

#[test]
fn help_flag_prints_usage() {
    let output = Command::new(binary_path())
        .arg("--help")
        .output()
        .expect("failed to run uart-sim");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Usage: uart-sim"));
}

#[test]
fn bundled_bench_scenario_passes() {
    let script = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios/bench.uart");

    let output = Command::new(binary_path())
        .args(["run", script.to_str().unwrap()])
        .output()
        .expect("failed to run uart-sim");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Expectations: 9 passed, 0 failed (total: 9)"));
}
