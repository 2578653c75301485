//! Runs the `cheddar` front-end against the real `cheddar-host` binary.

use cheddar::ui::MESSAGE_SENT;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Feed `input` to a fresh front-end, close stdin and return its stdout.
async fn run_front_end(input: &str) -> String {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut child = Command::new(env!("CARGO_BIN_EXE_cheddar"))
        .arg("--host")
        .arg(env!("CARGO_BIN_EXE_cheddar-host"))
        .arg("--config")
        .arg(dir.path().join("config.toml"))
        .arg("--settings")
        .arg(dir.path().join("settings.toml"))
        .env("CHEDDAR_DATA_DIR", dir.path().join("data"))
        .env("CHEDDAR_CONFIG_DIR", dir.path().join("config"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .expect("spawn cheddar");

    let mut stdin = child.stdin.take().expect("stdin");
    stdin.write_all(input.as_bytes()).await.expect("write input");
    drop(stdin);

    let output = tokio::time::timeout(Duration::from_secs(20), child.wait_with_output())
        .await
        .expect("front-end did not exit")
        .expect("wait for front-end");
    assert!(output.status.success(), "exit status {}", output.status);
    String::from_utf8(output.stdout).expect("utf-8 stdout")
}

fn reply_count(stdout: &str) -> usize {
    let expected = format!("[assistant] {MESSAGE_SENT}");
    stdout.lines().filter(|line| *line == expected).count()
}

#[tokio::test]
async fn replies_are_printed_before_exit_at_end_of_input() {
    let stdout = run_front_end("first\nsecond\nthird\n").await;
    assert!(stdout.contains("[you] first"), "{stdout}");
    assert_eq!(reply_count(&stdout), 3, "{stdout}");
}

#[tokio::test]
async fn quit_waits_for_in_flight_replies() {
    let stdout = run_front_end("hello\n/quit\nignored\n").await;
    assert!(stdout.contains("[you] hello"), "{stdout}");
    assert!(!stdout.contains("[you] ignored"), "{stdout}");
    assert_eq!(reply_count(&stdout), 1, "{stdout}");
}
