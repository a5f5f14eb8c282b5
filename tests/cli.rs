use assert_cmd::Command;
use predicates::prelude::*;

fn harvester(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("harvester").unwrap();
    cmd.current_dir(dir)
        .env_remove("CHANNEL_URL")
        .env_remove("MAX_VIDEOS")
        .env_remove("BROWSER_PROFILE")
        .env_remove("YT_COOKIES")
        .env("XDG_CONFIG_HOME", dir.join("xdg"));
    cmd
}

#[test]
fn test_help_lists_commands() {
    let tmp = tempfile::tempdir().unwrap();
    harvester(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetch").and(predicate::str::contains("chunk")));
}

#[test]
fn test_fetch_without_videos_fails_and_leaves_index_alone() {
    let tmp = tempfile::tempdir().unwrap();
    let ids = tmp.path().join("ids.jsonl");
    let index = tmp.path().join("index.jsonl");
    std::fs::write(&ids, "\n").unwrap();

    harvester(tmp.path())
        .args(["--quiet", "fetch", "--ids-file"])
        .arg(&ids)
        .arg("--index-file")
        .arg(&index)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No videos to process"));

    assert!(!index.exists());
}

#[test]
fn test_chunk_without_index_fails() {
    let tmp = tempfile::tempdir().unwrap();
    harvester(tmp.path())
        .args(["chunk", "--index", "missing.jsonl", "--output-dir", "out"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read index"));
}

#[test]
fn test_invalid_chunk_overlap_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    harvester(tmp.path())
        .args(["chunk", "--chunk-size", "100", "--chunk-overlap", "100"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunk_overlap"));
}
