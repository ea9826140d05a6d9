//! Integration tests for the `timeline` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to exercise the chain, gaps,
//! stats, and combine subcommands through the actual binary, including stdin
//! piping, file I/O, window selection, and error handling.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: path to a fixture under `tests/fixtures`.
fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Helper: the `timeline` binary with logging env cleared.
fn timeline() -> Command {
    let mut cmd = Command::cargo_bin("timeline").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Helper: run a subcommand and parse its stdout as JSON.
fn json_output(args: &[&str]) -> serde_json::Value {
    let output = timeline().args(args).output().unwrap();
    assert!(output.status.success(), "command failed: {:?}", output);
    serde_json::from_slice(&output.stdout).expect("stdout must be JSON")
}

fn ids(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|n| n["id"].as_str().unwrap_or("").to_string())
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// chain
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn chain_overwrites_conflicting_events() {
    let day = fixture("day.json");
    let chain = json_output(&["chain", "-i", day.as_str()]);

    assert_eq!(ids(&chain), ["standup", "design-review", "focus", "late-call"]);
}

#[test]
fn chain_reads_stdin() {
    let input = std::fs::read_to_string(fixture("day.json")).unwrap();

    timeline()
        .arg("chain")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"focus\""))
        .stdout(predicate::str::contains("\"lunch\"").not());
}

#[test]
fn chain_writes_output_file() {
    let out = std::env::temp_dir().join(format!("timeline-chain-{}.json", std::process::id()));
    let out_path = out.to_str().unwrap();

    timeline()
        .args(["chain", "-i", fixture("day.json").as_str(), "-o", out_path])
        .assert()
        .success();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written.as_array().unwrap().len(), 4);
    let _ = std::fs::remove_file(&out);
}

#[test]
fn chain_truncated_window_clips_edges() {
    timeline()
        .args([
            "chain",
            "-i",
            fixture("day.json").as_str(),
            "--window-start",
            "2026-03-02T08:00:00Z",
            "--window-end",
            "2026-03-02T18:00:00",
            "--edge",
            "truncated",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("2026-03-02T18:00:00Z"))
        .stdout(predicate::str::contains("18:30").not());
}

#[test]
fn chain_exclusive_window_drops_crossing_events() {
    let day = fixture("day.json");
    let chain = json_output(&[
        "chain",
        "-i",
        day.as_str(),
        "--window-start",
        "2026-03-02T09:00:00Z",
        "--window-end",
        "2026-03-02T18:00:00Z",
        "--edge",
        "exclusive",
    ]);

    assert_eq!(ids(&chain), ["standup", "design-review", "focus"]);
}

#[test]
fn window_does_not_change_which_event_wins() {
    let unsorted = fixture("unsorted.json");
    let plain = json_output(&["chain", "-i", unsorted.as_str()]);
    let windowed = json_output(&[
        "chain",
        "-i",
        unsorted.as_str(),
        "--window-start",
        "2026-03-02T09:00:00Z",
        "--window-end",
        "2026-03-02T18:00:00Z",
    ]);

    assert_eq!(ids(&plain), ["moved"]);
    assert_eq!(ids(&windowed), ["moved"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// gaps
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn gaps_between_timeline_entries() {
    let day = fixture("day.json");
    let gaps = json_output(&["gaps", "-i", day.as_str()]);

    assert_eq!(
        ids(&gaps),
        [
            "GAP: standup--design-review",
            "GAP: design-review--focus",
            "GAP: focus--late-call",
        ]
    );
    assert_eq!(gaps[1]["start"], "2026-03-02T11:00:00Z");
    assert_eq!(gaps[1]["end"], "2026-03-02T12:30:00Z");
}

// ─────────────────────────────────────────────────────────────────────────────
// stats
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn stats_reports_counts_and_durations() {
    timeline()
        .args(["stats", "-i", fixture("day.json").as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Events:       5"))
        .stdout(predicate::str::contains("Nodes:        4"))
        .stdout(predicate::str::contains("Overwritten:  1"))
        .stdout(predicate::str::contains("Busy time:    13500 s"))
        .stdout(predicate::str::contains("Gaps:         3"))
        .stdout(predicate::str::contains("Free time:    20700 s"));
}

#[test]
fn stats_empty_input() {
    timeline()
        .arg("stats")
        .write_stdin("[]")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nodes:        0"))
        .stdout(predicate::str::contains("Busy time:    0 s"));
}

#[test]
fn verbose_logs_overwrites_to_stderr() {
    timeline()
        .args(["stats", "-v", "-i", fixture("day.json").as_str()])
        .assert()
        .success()
        .stderr(predicate::str::contains("insertion overwrote nodes"));
}

// ─────────────────────────────────────────────────────────────────────────────
// combine
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn combine_intersection() {
    let (day, other) = (fixture("day.json"), fixture("other.json"));
    let report = json_output(&[
        "combine",
        "-i",
        day.as_str(),
        "--with",
        other.as_str(),
        "--op",
        "intersection",
    ]);

    assert_eq!(ids(&report["events"]), ["design-review"]);
    assert_eq!(report["total_seconds"], 3600);
    assert_eq!(
        report["name"],
        "(EventCollection intersection EventCollection)"
    );
}

#[test]
fn combine_union_defaults() {
    let (day, other) = (fixture("day.json"), fixture("other.json"));
    let report = json_output(&["combine", "-i", day.as_str(), "--with", other.as_str()]);

    assert_eq!(report["events"].as_array().unwrap().len(), 6);
    assert_eq!(report["total_seconds"], 18900);
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn unknown_edge_is_rejected() {
    timeline()
        .args(["chain", "-i", fixture("day.json").as_str(), "--edge", "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("edge 'sideways'"));
}

#[test]
fn malformed_event_is_rejected() {
    timeline()
        .args(["chain", "-i", fixture("malformed.json").as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed interval backwards"));
}

#[test]
fn window_start_requires_window_end() {
    timeline()
        .args([
            "chain",
            "-i",
            fixture("day.json").as_str(),
            "--window-start",
            "2026-03-02T08:00:00Z",
        ])
        .assert()
        .failure();
}

#[test]
fn missing_input_file_is_reported() {
    timeline()
        .args(["chain", "-i", "/nonexistent/events.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read file"));
}
