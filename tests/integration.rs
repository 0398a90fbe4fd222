mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::io::Write;
use tempfile::TempDir;

use common::{write_config, NEGATIVE, POSITIVE};

fn rater_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_rater"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), &[0, 1, 2, 3, 4], "offset");
    (tmp, config_path)
}

fn run_rater(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = rater_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run rater binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_rater(&config, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully"));
    assert!(tmp.path().join("data").join("reviews.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config) = setup_test_env();
    let (_, _, first) = run_rater(&config, &["init"]);
    let (_, stderr, second) = run_rater(&config, &["init"]);
    assert!(first);
    assert!(second, "second init failed: {}", stderr);
}

#[test]
fn test_normalize_argument() {
    let tmp = TempDir::new().unwrap();
    // Normalize needs no config file.
    let (stdout, stderr, success) = run_rater(
        &tmp.path().join("missing.toml"),
        &["normalize", "This phone is GREAT!!! See http://example.com/x"],
    );
    assert!(success, "normalize failed: {}", stderr);
    assert_eq!(stdout.trim_end(), "phone great see");
}

#[test]
fn test_normalize_stdin_line_per_line() {
    let mut child = Command::new(rater_binary())
        .arg("normalize")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"Terrible. Awful battery.\nthe a an\nLove it, 10/10\n")
        .unwrap();

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines, vec!["terrible awful battery", "", "love"]);
}

#[test]
fn test_predict_positive_and_negative() {
    let (_tmp, config) = setup_test_env();

    let (stdout, stderr, success) = run_rater(&config, &["predict", POSITIVE]);
    assert!(success, "predict failed: {}", stderr);
    assert!(stdout.contains("predicted rating: 5"), "got: {}", stdout);

    let (stdout, _, success) = run_rater(&config, &["predict", NEGATIVE]);
    assert!(success);
    assert!(stdout.contains("predicted rating: 1"), "got: {}", stdout);
}

#[test]
fn test_predict_explain() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_rater(&config, &["predict", "--explain", POSITIVE]);
    assert!(success, "predict failed: {}", stderr);
    assert!(stdout.contains("normalized: phone great love"));
    assert!(stdout.contains("label:      4"));
    assert!(stdout.contains("mapping:    offset"));
    assert!(stdout.contains("predicted rating: 5"));
}

#[test]
fn test_predict_empty_review() {
    let (_tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_rater(&config, &["predict", ""]);
    assert!(success, "predict failed: {}", stderr);
    assert!(stdout.contains("predicted rating: 3"), "got: {}", stdout);
}

#[test]
fn test_predict_direct_convention() {
    let tmp = TempDir::new().unwrap();
    let config = write_config(tmp.path(), &[1, 2, 3, 4, 5], "direct");
    let (stdout, stderr, success) = run_rater(&config, &["predict", POSITIVE]);
    assert!(success, "predict failed: {}", stderr);
    assert!(stdout.contains("predicted rating: 5"));
}

#[test]
fn test_mismatched_convention_fails_at_load() {
    let tmp = TempDir::new().unwrap();
    // Labels 0..=4 under the direct convention would emit rating 0.
    let config = write_config(tmp.path(), &[0, 1, 2, 3, 4], "direct");
    let (_, stderr, success) = run_rater(&config, &["predict", POSITIVE]);
    assert!(!success);
    assert!(stderr.contains("label_mapping"), "stderr: {}", stderr);
}

#[test]
fn test_missing_label_mapping_rejected() {
    let (tmp, config) = setup_test_env();
    let content = fs::read_to_string(&config).unwrap();
    let stripped: String = content
        .lines()
        .filter(|l| !l.starts_with("label_mapping"))
        .map(|l| format!("{}\n", l))
        .collect();
    let path = tmp.path().join("no_mapping.toml");
    fs::write(&path, stripped).unwrap();

    let (_, stderr, success) = run_rater(&path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("label_mapping"), "stderr: {}", stderr);
}

#[test]
fn test_missing_model_artifact_fails() {
    let (tmp, config) = setup_test_env();
    fs::remove_file(tmp.path().join("models").join("linear_model.json")).unwrap();
    let (_, _, success) = run_rater(&config, &["predict", POSITIVE]);
    assert!(!success);
}

#[test]
fn test_history_empty() {
    let (_tmp, config) = setup_test_env();
    run_rater(&config, &["init"]);
    let (stdout, stderr, success) = run_rater(&config, &["history"]);
    assert!(success, "history failed: {}", stderr);
    assert!(stdout.contains("No saved predictions."));

    let (stdout, _, success) = run_rater(&config, &["history", "--json"]);
    assert!(success);
    let value: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(value["history"].as_array().unwrap().len(), 0);
}

#[test]
fn test_missing_config_file() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_rater(&tmp.path().join("nope.toml"), &["init"]);
    assert!(!success);
    assert!(stderr.contains("nope.toml"), "stderr: {}", stderr);
}
