use assert_cmd::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    assert!(Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .unwrap()
        .success());
}

fn init_git_repo(dir: &Path) {
    git(dir, &["init", "-b", "master"]);
    git(dir, &["config", "core.autocrlf", "false"]);
    git(dir, &["config", "core.safecrlf", "false"]);
    git(dir, &["config", "user.email", "you@example.com"]);
    git(dir, &["config", "user.name", "Your Name"]);
}

fn commit_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut f = File::create(&path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
    f.sync_all().unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-m", &format!("add {name}")]);
}

fn churn_json(dir: &Path, extra: &[&str]) -> serde_json::Value {
    let mut cmd = Command::cargo_bin("gchurn").unwrap();
    cmd.current_dir(dir)
        .arg("--repo")
        .arg(dir)
        .arg("churn")
        .arg("--json")
        .args(extra);
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).unwrap()
}

fn sum(v: &serde_json::Value) -> u64 {
    v.as_array().unwrap().iter().map(|x| x.as_u64().unwrap()).sum()
}

#[test]
fn churn_text_outputs_global_block() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "src/a.rs", "fn a(){}\nfn b(){}\n");

    let mut cmd = Command::cargo_bin("gchurn").unwrap();
    cmd.current_dir(dir.path())
        .arg("--repo")
        .arg(dir.path())
        .arg("churn");
    let out = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("  global:\n"));
    assert!(text.contains("    days: [0]\n"));
    assert!(text.contains("    additions: [2]\n"));
}

#[test]
fn churn_json_counts_lines() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "lib.rs", "pub fn hi(){}\n");
    commit_file(dir.path(), "lib.rs", "pub fn hi(){ println!(\"hi\"); }\npub fn bye(){}\n");

    let v = churn_json(dir.path(), &[]);
    let global = &v["result"]["global"];
    assert_eq!(sum(&global["additions"]), 3);
    assert_eq!(sum(&global["removals"]), 1);
    assert!(v["result"]["people"].as_object().unwrap().is_empty());
}

#[test]
fn churn_people_tracks_authors() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "a.txt", "a\nb\n");

    let v = churn_json(dir.path(), &["--churn-people"]);
    let people = v["result"]["people"].as_object().unwrap();
    assert_eq!(people.len(), 1);
    assert_eq!(sum(&people["Your Name"]["additions"]), 2);
}

#[test]
fn merge_commits_are_counted_once() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());

    commit_file(dir.path(), "file.txt", "a\n");

    git(dir.path(), &["checkout", "-b", "feat"]);
    commit_file(dir.path(), "feat.txt", "f1\n");

    git(dir.path(), &["checkout", "master"]);
    commit_file(dir.path(), "file.txt", "a\nc\n");

    git(dir.path(), &["merge", "--no-ff", "feat", "-m", "merge feat"]);

    let v = churn_json(dir.path(), &[]);
    // file.txt (1) + feat.txt (1) + file.txt change (1), plus the merge seen once against
    // its first parent (feat.txt, 1 line).
    assert_eq!(sum(&v["result"]["global"]["additions"]), 4);
}

#[test]
fn renamed_file_counts_only_its_edits() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    let body: String = (0..20).map(|i| format!("line {i}\n")).collect();
    commit_file(dir.path(), "a.txt", &body);

    git(dir.path(), &["mv", "a.txt", "b.txt"]);
    git(dir.path(), &["commit", "-m", "rename a.txt"]);

    let v = churn_json(dir.path(), &[]);
    let global = &v["result"]["global"];
    assert_eq!(sum(&global["additions"]), 20);
    assert_eq!(sum(&global["removals"]), 0);
}

#[test]
fn binary_output_is_not_empty() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    init_git_repo(dir.path());
    commit_file(dir.path(), "a.txt", "a\n");

    let mut cmd = Command::cargo_bin("gchurn").unwrap();
    cmd.current_dir(dir.path())
        .arg("--repo")
        .arg(dir.path())
        .args(["churn", "--binary"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    assert!(!out.is_empty());
}

#[test]
fn list_shows_churn() {
    let mut cmd = Command::cargo_bin("gchurn").unwrap();
    let out = cmd.arg("list").assert().success().get_output().stdout.clone();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("--churn"));
    assert!(text.contains("--churn-people"));
}
