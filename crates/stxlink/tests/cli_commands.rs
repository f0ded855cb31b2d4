#![cfg(feature = "cli")]

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn stxlink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stxlink"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("stxlink should run")
}

fn json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be json")
}

#[test]
fn encode_emits_wire_hex() {
    let output = stxlink(&["--format", "json", "encode", "--hex", "aabbcc"]);

    assert!(output.status.success());
    let payload = json(&output);
    assert_eq!(payload["wire_hex"], "02 03 aa bb cc 31 03");
    assert_eq!(payload["checksum"], 0x31);
    assert_eq!(payload["wire_size"], 7);
}

#[test]
fn encode_raw_writes_frame_bytes() {
    let output = stxlink(&["--format", "raw", "encode", "--data", "hi"]);
    assert!(output.status.success());
    assert_eq!(output.stdout, vec![0x02, 0x02, b'h', b'i', 0xd1, 0x03]);
}

#[test]
fn encode_oversized_payload_is_usage_error() {
    let payload = "x".repeat(256);
    let output = stxlink(&["encode", "--data", &payload]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid parameter"));
}

#[test]
fn encode_respects_max_frame_size() {
    let output = stxlink(&["encode", "--data", "abc", "--max-frame-size", "6"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("buffer too small"));
}

#[test]
fn decode_hex_reports_frames() {
    let output = stxlink(&[
        "--format",
        "json",
        "decode",
        "--hex",
        "ff 02 02 68 69 d1 03",
    ]);

    assert!(output.status.success());
    let payload = json(&output);
    assert_eq!(payload["frames_completed"], 1);
    assert_eq!(payload["bytes_discarded"], 1);
    assert_eq!(payload["events"][0]["event"], "frame");
    assert_eq!(payload["events"][0]["payload"], "hi");
}

#[test]
fn decode_stdin_with_rejection_exits_data_invalid() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_stxlink"))
        .args(["--format", "json", "decode"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("decode should start");

    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(&[0x02, 0x01, 0x41, 0x40, 0x03, 0x02, 0x01, 0x42, 0x42, 0x03])
        .expect("stdin should accept bytes");
    let output = child.wait_with_output().expect("decode should finish");

    assert_eq!(output.status.code(), Some(60));
    let payload = json(&output);
    assert_eq!(payload["frames_rejected"], 1);
    assert_eq!(payload["frames_completed"], 1);
    assert_eq!(payload["events"][0]["event"], "rejected");
}

#[test]
fn simulate_lossless_succeeds() {
    let output = stxlink(&["--format", "json", "simulate", "--data", "hello"]);

    assert!(output.status.success());
    let payload = json(&output);
    assert_eq!(payload["succeeded"], true);
    assert_eq!(payload["retries"], 0);
    assert_eq!(payload["transmissions"], 1);
}

#[test]
fn simulate_drop_first_retries_once() {
    let output = stxlink(&[
        "--format",
        "json",
        "simulate",
        "--hex",
        "10 20 30",
        "--drop-first",
        "1",
    ]);

    assert!(output.status.success());
    let payload = json(&output);
    assert_eq!(payload["retries"], 1);
    assert_eq!(payload["transmissions"], 2);
    assert_eq!(payload["delivered"][0], "10 20 30");
}

#[test]
fn simulate_drop_all_times_out_with_124() {
    let output = stxlink(&[
        "--format",
        "json",
        "simulate",
        "--data",
        "lost",
        "--drop-all",
        "--timeout",
        "100ms",
    ]);

    assert_eq!(output.status.code(), Some(124));
    let payload = json(&output);
    assert_eq!(payload["succeeded"], false);
    assert_eq!(payload["retries"], 3);
    assert_eq!(payload["channel"]["transmissions_dropped"], 3);
}

#[test]
fn simulate_bad_duration_is_usage_error() {
    let output = stxlink(&["simulate", "--data", "x", "--timeout", "soon"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn selftest_passes() {
    let output = stxlink(&["--format", "json", "selftest"]);

    assert!(output.status.success());
    let payload = json(&output);
    assert_eq!(payload["overall"], "pass");
    assert!(payload["checks"].as_array().map_or(0, Vec::len) >= 5);
}

#[test]
fn version_reports_package_version() {
    let output = stxlink(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("stxlink {}", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn version_extended_lists_protocol_constants() {
    let output = stxlink(&["version", "--extended"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("max_payload=255"));
    assert!(stdout.contains("max_retries=3"));
}
