use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("probe")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("health"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("vision-stream"))
        .stdout(predicate::str::contains("questions"))
        .stdout(predicate::str::contains("--backend-url"));
}

#[test]
fn test_stream_help_shows_options() {
    cargo_bin_cmd!("probe")
        .args(["stream", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--max-tokens"))
        .stdout(predicate::str::contains("--final-only"))
        .stdout(predicate::str::contains("--preset"));
}

#[test]
fn test_question_and_preset_conflict() {
    cargo_bin_cmd!("probe")
        .args(["generate", "-q", "hi", "--preset", "simple"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("probe")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
