//! Runs the `daily-picks` binary against temporary database directories.

mod common;

use common::write_seed_files;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn run(db_dir: &Path, args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_daily-picks"))
        .arg("--db-dir")
        .arg(db_dir)
        .args(args)
        .env("LOG_LEVEL", "error")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "daily-picks {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn test_first_launch_seeds_without_explicit_seed_command() {
    let dir = TempDir::new().unwrap();
    write_seed_files(dir.path(), 3, 2);

    let out = run(dir.path(), &["current", "movie"]);
    assert!(out.contains("[movie] #"), "unexpected output: {}", out);

    let out = run(dir.path(), &["progress"]);
    assert!(out.contains("Movies: 0 / 3"), "unexpected output: {}", out);
    assert!(out.contains("Albums: 0 / 2"), "unexpected output: {}", out);
}

#[test]
fn test_empty_catalog_is_not_reported_as_completed() {
    let dir = TempDir::new().unwrap();

    let out = run(dir.path(), &["current", "album"]);
    assert!(!out.contains("completed every"), "unexpected output: {}", out);
    assert!(out.contains("No album in the catalog"), "unexpected output: {}", out);
}

#[test]
fn test_zero_byte_database_opens() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("daily.db"), b"").unwrap();
    write_seed_files(dir.path(), 1, 1);

    let out = run(dir.path(), &["progress"]);
    assert!(out.contains("Movies: 0 / 1"), "unexpected output: {}", out);
}

#[test]
fn test_exhausted_category_is_congratulated() {
    let dir = TempDir::new().unwrap();
    write_seed_files(dir.path(), 1, 1);

    let out = run(dir.path(), &["complete", "movie", "--rating", "4.5"]);
    assert!(out.contains("completed every movie"), "unexpected output: {}", out);
}
