use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use rmpv::Value;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("sensordump"))
}

fn repo_root() -> PathBuf {
    let manifest = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root")
        .to_path_buf()
}

fn golden_input(case: &str) -> PathBuf {
    repo_root()
        .join("tests")
        .join("golden")
        .join(case)
        .join("input.txt")
}

fn lidar_frame(stamp: f64, points: &[f64]) -> Value {
    Value::Map(vec![
        (Value::from("stamp"), Value::from(stamp)),
        (
            Value::from("points"),
            Value::Array(points.iter().copied().map(Value::from).collect()),
        ),
    ])
}

fn write_lidar_log(path: &Path) {
    let mut bytes = Vec::new();
    for frame in [
        lidar_frame(1.0, &[0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.5]),
        lidar_frame(2.0, &[2.0, 2.0, 2.0, 0.25]),
    ] {
        rmpv::encode::write_value(&mut bytes, &frame).expect("encode frame");
    }
    fs::write(path, bytes).expect("write log");
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            contains("ply")
                .and(contains("lidar"))
                .and(contains("heightmap"))
                .and(contains("merge"))
                .and(contains("overlay")),
        );
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.txt");

    cmd()
        .arg("ply")
        .arg(missing)
        .arg("-o")
        .arg(temp.path().join("out.ply"))
        .assert()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn ply_writes_cloud_and_report() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("cloud.ply");
    let report = temp.path().join("reports").join("report.json");

    cmd()
        .arg("ply")
        .arg(golden_input("text_basic"))
        .arg("-o")
        .arg(&output)
        .arg("--report")
        .arg(&report)
        .assert()
        .success()
        .stderr(contains("OK:"));

    let ply = fs::read_to_string(&output).expect("read ply");
    assert!(ply.contains("element vertex 2"));
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).expect("read report")).expect("json");
    assert_eq!(json["conversion"], "text");
    assert_eq!(json["frames_summary"]["records_total"], 2);
}

#[test]
fn stdout_outputs_json() {
    let temp = TempDir::new().expect("tempdir");
    let assert = cmd()
        .arg("ply")
        .arg(golden_input("text_basic"))
        .arg("-o")
        .arg(temp.path().join("cloud.xyz"))
        .arg("--format")
        .arg("xyz")
        .arg("--stdout")
        .arg("--quiet")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(json["tool"]["name"], "sensordump");
}

#[test]
fn stdout_and_report_conflict() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("ply")
        .arg(golden_input("text_basic"))
        .arg("-o")
        .arg(temp.path().join("cloud.ply"))
        .arg("--stdout")
        .arg("--report")
        .arg(temp.path().join("report.json"))
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn pretty_and_compact_conflict() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("ply")
        .arg(golden_input("text_basic"))
        .arg("-o")
        .arg(temp.path().join("cloud.ply"))
        .arg("--pretty")
        .arg("--compact")
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn unknown_format_is_rejected() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("ply")
        .arg(golden_input("text_basic"))
        .arg("-o")
        .arg(temp.path().join("cloud.ply"))
        .arg("--format")
        .arg("obj")
        .assert()
        .failure()
        .stderr(contains("unknown format"));
}

#[test]
fn ply_rejects_raster_format() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("ply")
        .arg(golden_input("text_basic"))
        .arg("-o")
        .arg(temp.path().join("cloud.png"))
        .arg("--format")
        .arg("png")
        .assert()
        .code(2)
        .stderr(contains("cannot write png output").and(contains("hint:")));
}

#[test]
fn quiet_suppresses_ok_message() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("ply")
        .arg(golden_input("text_basic"))
        .arg("-o")
        .arg(temp.path().join("cloud.ply"))
        .arg("--quiet")
        .assert()
        .success()
        .stderr(contains("OK:").not());
}

#[test]
fn list_diagnostics_outputs_ids() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("ply")
        .arg(golden_input("text_trailing"))
        .arg("-o")
        .arg(temp.path().join("cloud.ply"))
        .arg("--list-diagnostics")
        .assert()
        .success()
        .stderr(contains("Diagnostics:").and(contains("SD-LENGTH-MISMATCH")));
}

#[test]
fn strict_fails_when_warnings_present() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("ply")
        .arg(golden_input("text_trailing"))
        .arg("-o")
        .arg(temp.path().join("cloud.ply"))
        .arg("--strict")
        .assert()
        .code(1)
        .stderr(contains("warning diagnostic(s) raised"));
}

#[test]
fn strict_passes_on_clean_input() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("ply")
        .arg(golden_input("text_basic"))
        .arg("-o")
        .arg(temp.path().join("cloud.ply"))
        .arg("--strict")
        .assert()
        .success();
}

#[test]
fn glob_with_multiple_matches_errors() {
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("a.txt"), "1 2 3\n").expect("write a");
    fs::write(temp.path().join("b.txt"), "4 5 6\n").expect("write b");
    let pattern = temp.path().join("*.txt");

    cmd()
        .arg("ply")
        .arg(pattern)
        .arg("-o")
        .arg(temp.path().join("cloud.ply"))
        .assert()
        .code(2)
        .stderr(contains("multiple inputs match pattern").and(contains("hint:")));
}

#[test]
fn glob_with_single_match_converts() {
    let temp = TempDir::new().expect("tempdir");
    fs::write(temp.path().join("only.txt"), "1 2 3\n").expect("write input");
    let pattern = temp.path().join("on?.txt");

    cmd()
        .arg("ply")
        .arg(pattern)
        .arg("-o")
        .arg(temp.path().join("cloud.ply"))
        .assert()
        .success();
    assert!(temp.path().join("cloud.ply").is_file());
}

#[test]
fn lidar_writes_frames_and_snapshots() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("scan.msgpack");
    write_lidar_log(&input);
    let output = temp.path().join("frames");

    cmd()
        .arg("lidar")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .arg("--snapshots")
        .assert()
        .success();

    for name in ["frame_0000.pcd", "frame_0000.ply", "frame_0001.pcd", "frame_0001.ply"] {
        assert!(output.join(name).is_file(), "missing {name}");
    }
    assert!(output.join("snapshots").join("frame_0001.json").is_file());
    assert!(output.join("snapshots").join("frame_0002.json").is_file());
}

#[test]
fn merge_requires_a_directory() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("merge")
        .arg(golden_input("text_basic"))
        .arg("-o")
        .arg(temp.path().join("merged.ply"))
        .assert()
        .code(2)
        .stderr(contains("input is not a directory"));
}
