// tests/test_cli.rs — Exit codes and output of the gaussblur binary.
//
// None of these reach device discovery: each fails on arguments or on the
// input file first, so they run without a GPU.

use std::path::PathBuf;
use std::process::{Command, Output};

fn gaussblur(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gaussblur"))
        .args(args)
        .current_dir(std::env::temp_dir())
        .output()
        .expect("failed to spawn gaussblur")
}

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("gaussblur-cli-{}-{name}", std::process::id()))
}

fn assert_usage_failure(out: &Output) {
    assert_eq!(out.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("Usage: gaussblur <RADIUS>"), "stdout: {stdout}");
}

// ===== Arguments =====

#[test]
fn no_arguments_prints_usage() {
    assert_usage_failure(&gaussblur(&[]));
}

#[test]
fn extra_positional_prints_usage() {
    assert_usage_failure(&gaussblur(&["3", "4"]));
}

#[test]
fn non_numeric_radius_prints_usage() {
    assert_usage_failure(&gaussblur(&["three"]));
    assert_usage_failure(&gaussblur(&["-2"]));
}

#[test]
fn oversized_workgroup_prints_usage() {
    assert_usage_failure(&gaussblur(&["1", "--workgroup", "64x64"]));
}

#[test]
fn help_exits_zero() {
    let out = gaussblur(&["--help"]);
    assert_eq!(out.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&out.stdout).contains("RADIUS"));
}

// ===== Input validation =====

fn run_on_input(name: &str, contents: &[u8]) -> (Output, PathBuf) {
    let input = scratch(&format!("{name}.ppm"));
    let output = scratch(&format!("{name}-out.ppm"));
    std::fs::write(&input, contents).unwrap();
    std::fs::remove_file(&output).ok();
    let out = gaussblur(&[
        "2",
        "--input",
        input.to_str().unwrap(),
        "--output",
        output.to_str().unwrap(),
    ]);
    std::fs::remove_file(&input).ok();
    (out, output)
}

#[test]
fn bad_magic_exits_one_without_output() {
    let (out, output) = run_on_input("bad-magic", b"P5\n2 2\n255\n\0\0\0\0");
    assert_eq!(out.status.code(), Some(1));
    assert!(!output.exists());
    assert!(String::from_utf8_lossy(&out.stderr).contains("P6"));
}

#[test]
fn bad_max_value_exits_one_without_output() {
    let (out, output) = run_on_input("bad-max", b"P6\n1 1\n1023\n\0\0\0\0\0\0");
    assert_eq!(out.status.code(), Some(1));
    assert!(!output.exists());
    assert!(String::from_utf8_lossy(&out.stderr).contains("1023"));
}

#[test]
fn truncated_payload_exits_one_without_output() {
    let (out, output) = run_on_input("short", b"P6\n4 4\n255\n\x01\x02\x03");
    assert_eq!(out.status.code(), Some(1));
    assert!(!output.exists());
}

#[test]
fn huge_dimensions_with_short_payload_exit_one() {
    for (name, header) in [
        ("huge-2e9", &b"P6\n2000000000 2000000000\n255\n\x01\x02\x03"[..]),
        ("huge-1e6", &b"P6\n1000000 1000000\n255\n\x01\x02\x03"[..]),
    ] {
        let (out, output) = run_on_input(name, header);
        assert_eq!(out.status.code(), Some(1), "{name}: {}", String::from_utf8_lossy(&out.stderr));
        assert!(!output.exists(), "{name}");
        assert!(String::from_utf8_lossy(&out.stderr).contains("truncated"), "{name}");
    }
}

#[test]
fn missing_input_exits_one() {
    let input = scratch("absent.ppm");
    let out = gaussblur(&["1", "--input", input.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    // Failed before discovery: no platform report on stdout.
    assert!(!String::from_utf8_lossy(&out.stdout).contains("platform"));
}
