use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

fn line(time: &str, probe: i32) -> String {
    format!(
        r#"{{"ambient":70,"connected":true,"grill":250,"grill_set":250,"probe":{probe},"probe_connected":true,"probe_set":200,"time":"{time}","units":1,"system_status":3}}"#
    )
}

fn write_cook_log(dir: &TempDir) -> PathBuf {
    let text = [
        line("2025-07-05T12:00:00Z", 100),
        line("2025-07-05T12:10:00Z", 130),
        line("2025-07-05T12:20:00Z", 150),
        line("2025-07-05T12:30:00Z", 163),
    ]
    .join("\n");
    let path = dir.path().join("cook.jsonl");
    fs::write(&path, text).unwrap();
    path
}

fn grillmon() -> Command {
    let mut cmd = Command::cargo_bin("grillmon").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "ok", "stdout")]
#[case(&["forecast"], 2, "required", "stderr")]
#[case(&["forecast", "-i", "x.jsonl", "--actual", "yesterday"], 2, "RFC3339", "stderr")]
#[case(&["forecast", "-i", "/definitely/not/here.jsonl"], 4, "could not be read", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let assert = grillmon().args(args).assert().code(exit_code);
    match stream {
        "stdout" => assert.stdout(predicate::str::contains(needle)),
        _ => assert.stderr(predicate::str::contains(needle)),
    };
}

#[test]
fn invalid_config_exits_3() {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, "[estimator]\nhistory_len = 0\n").unwrap();
    grillmon()
        .arg("--config")
        .arg(&cfg)
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("history_len"));
}

#[test]
fn json_errors_are_structured() {
    let out = grillmon()
        .args(["--json", "forecast", "-i", "/definitely/not/here.jsonl"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(4));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let last = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "Io");
    assert!(v["message"].as_str().unwrap().contains("What happened"));
}

#[test]
fn forecast_prints_table_and_summary() {
    let dir = tempdir().unwrap();
    let log = write_cook_log(&dir);
    grillmon()
        .args(["forecast", "--actual", "2025-07-05T13:30:00Z", "-i"])
        .arg(&log)
        .assert()
        .success()
        .stdout(predicate::str::contains("Forecasting ETA predictions from 4 entries"))
        .stdout(predicate::str::contains("predicted finish"))
        .stdout(predicate::str::contains("Total cook time: 1h30m"))
        .stdout(predicate::str::contains("Monitored time: 30m"))
        .stdout(predicate::str::contains("100°F → 163°F (target 200°F)"));
}

#[test]
fn forecast_json_and_csv() {
    let dir = tempdir().unwrap();
    let log = write_cook_log(&dir);
    let csv = dir.path().join("rows.csv");
    let out = grillmon()
        .args(["--json", "forecast", "-i"])
        .arg(&log)
        .arg("--csv")
        .arg(&csv)
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[3]["eta_s"].as_u64().unwrap() > 0);
    assert_eq!(lines[4]["summary"]["entries"], 4);

    let text = fs::read_to_string(&csv).unwrap();
    assert!(text.starts_with("time,delta_s,grill,probe"));
    assert_eq!(text.lines().count(), 5);
}

#[test]
fn forecast_on_log_without_probe_data() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.jsonl");
    fs::write(&path, "{\"connected\":true,\"grill\":250}\nnot json\n").unwrap();
    grillmon()
        .args(["forecast", "-i"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("No valid probe data found"));
}

fn recent_stream(path: &Path) {
    let now = chrono::Utc::now().timestamp();
    let envelope = |dt: i64, probe: i32, connected: bool| {
        format!(
            r#"{{"status":{{"ambient":70,"connected":{connected},"grill":250,"set":250,"probe":{probe},"probe_con":1,"probe_set":200,"system_status":3,"time":{},"units":1}}}}"#,
            now - 1800 + dt
        )
    };
    let text = [
        envelope(0, 100, true),
        envelope(600, 130, true),
        envelope(900, 135, false),
        envelope(1200, 150, true),
        envelope(1800, 163, true),
    ]
    .join("\n");
    fs::write(path, text).unwrap();
}

#[test]
fn monitor_annotates_statuses_from_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("stream.jsonl");
    let output = dir.path().join("out.jsonl");
    recent_stream(&input);
    grillmon()
        .args(["monitor", "-i"])
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    let written = fs::read_to_string(&output).unwrap();
    let statuses: Vec<serde_json::Value> = written
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(statuses.len(), 4);
    assert!(statuses.iter().all(|s| s["probe_eta"].is_string()));
}

#[test]
fn monitor_reads_stdin() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("stream.jsonl");
    let output = dir.path().join("out.jsonl");
    recent_stream(&input);
    grillmon()
        .args(["monitor", "-o"])
        .arg(&output)
        .write_stdin(fs::read_to_string(&input).unwrap())
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&output).unwrap().lines().count(), 4);
}
