use std::process::{Command, Output};
use tempfile::TempDir;

fn diagnosa(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_diagnosa"))
        .arg("--config-dir")
        .arg(dir.path())
        .args(args)
        .current_dir(dir.path())
        .env_remove("GEMINI_API_KEY")
        .env_remove("DIAGNOSA__PROVIDERS__GEMINI__API_KEY")
        .env("RUST_LOG", "info")
        .env("LOG_FORMAT", "json")
        .output()
        .expect("failed to run diagnosa")
}

#[test]
fn offline_ask_prints_reply_and_json_logs() {
    let dir = TempDir::new().unwrap();
    let output = diagnosa(&dir, &["--offline", "ask", "--message", "demam berdarah"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("(offline) demam berdarah"));

    let submit_logged = stdout
        .lines()
        .any(|line| line.trim().starts_with('{') && line.contains("Submitting to"));
    assert!(submit_logged, "no JSON submit log in:\n{}", stdout);
}

#[test]
fn missing_credential_halts_startup() {
    let dir = TempDir::new().unwrap();
    let output = diagnosa(&dir, &["ask", "--message", "tifus"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("GEMINI_API_KEY"), "stderr: {}", stderr);
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Asisten:"));
}

#[test]
fn status_reports_missing_credential() {
    let dir = TempDir::new().unwrap();
    let output = diagnosa(&dir, &["status"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("gemini-1.5-flash"));
    assert!(stdout.contains("GEMINI_API_KEY: not configured"));
}
