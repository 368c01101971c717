use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("probe")
        .env("PROBE_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"))
        .stdout(predicate::str::contains("not created"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    cargo_bin_cmd!("probe")
        .env("PROBE_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    assert!(config_path.exists());

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("backend_url ="));
    assert!(contents.contains("# file ="));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(&config_path, "# existing config").unwrap();

    cargo_bin_cmd!("probe")
        .env("PROBE_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_generate_prints_defaults() {
    cargo_bin_cmd!("probe")
        .args(["config", "generate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("stream_max_tokens = 4096"))
        .stdout(predicate::str::contains("[vision_questions]"));
}

#[test]
fn test_questions_lists_config_presets() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[questions]\nweather = \"Will it rain tomorrow?\"\n",
    )
    .unwrap();

    cargo_bin_cmd!("probe")
        .env("PROBE_HOME", dir.path())
        .arg("questions")
        .assert()
        .success()
        .stdout(predicate::str::contains("weather"))
        .stdout(predicate::str::contains("Will it rain tomorrow?"))
        .stdout(predicate::str::contains("palm"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "backend_url = [").unwrap();

    cargo_bin_cmd!("probe")
        .env("PROBE_HOME", dir.path())
        .arg("health")
        .assert()
        .failure()
        .stderr(predicate::str::contains("load config"));
}
