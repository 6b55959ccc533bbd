// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios over the `hone` binary with the local engine
//! and the file cache.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn hone(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hone").unwrap();
    cmd.current_dir(dir);
    cmd
}

fn write_honefile(dir: &Path, content: &str) {
    std::fs::write(dir.join("Honefile"), content).unwrap();
}

const CHAIN: &str = r#"
engine = "local"

cache {
  file {
    path = ".hone-cache"
  }
}

job "a" {
  shell  = "echo alpha > a.txt; echo a >> runs.txt"
  output = "a.txt"
}

job "b" {
  deps   = ["a"]
  shell  = "cat a.txt > b.txt; echo b >> runs.txt"
  output = "b.txt"
}

job "c" {
  deps   = ["b"]
  shell  = "cat b.txt > c.txt; echo c >> runs.txt"
  output = "c.txt"
}
"#;

#[test]
fn linear_chain_clean_build() {
    let dir = tempfile::tempdir().unwrap();
    write_honefile(dir.path(), CHAIN);

    hone(dir.path()).arg("c").assert().success();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("c.txt")).unwrap(),
        "alpha\n"
    );
    // Every executor ran exactly once, in order.
    assert_eq!(
        std::fs::read_to_string(dir.path().join("runs.txt")).unwrap(),
        "a\nb\nc\n"
    );
}

#[test]
fn second_run_is_served_from_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_honefile(dir.path(), CHAIN);

    hone(dir.path()).arg("c").assert().success();

    // Outputs vanish; definitions are unchanged.
    for out in ["a.txt", "b.txt", "c.txt"] {
        std::fs::remove_file(dir.path().join(out)).unwrap();
    }

    hone(dir.path())
        .arg("c")
        .assert()
        .success()
        .stdout(predicate::str::contains("from cache (file)"));

    // Executors were never invoked again...
    assert_eq!(
        std::fs::read_to_string(dir.path().join("runs.txt")).unwrap(),
        "a\nb\nc\n"
    );
    // ...yet every output is back on disk.
    for out in ["a.txt", "b.txt", "c.txt"] {
        assert!(dir.path().join(out).exists(), "{out} restored");
    }
}

#[test]
fn changed_definition_rebuilds() {
    let dir = tempfile::tempdir().unwrap();
    write_honefile(dir.path(), CHAIN);
    hone(dir.path()).arg("a").assert().success();

    write_honefile(
        dir.path(),
        &CHAIN.replace("echo alpha > a.txt", "echo beta > a.txt"),
    );
    hone(dir.path()).arg("a").assert().success();

    assert_eq!(
        std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "beta\n"
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("runs.txt")).unwrap(),
        "a\na\n"
    );
}

#[test]
fn failure_propagation_sets_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    write_honefile(
        dir.path(),
        r#"
engine = "local"

job "a" {
  shell = "exit 1"
}

job "b" {
  deps  = ["a"]
  shell = "touch b.txt"
}

job "c" {
  deps  = ["b"]
  shell = "touch c.txt"
}
"#,
    );

    // a fails, b and c convert it into dep failures: three errors.
    hone(dir.path())
        .arg("c")
        .assert()
        .code(3)
        .stdout(predicate::str::contains("Failed dependencies: [a]"));

    assert!(!dir.path().join("b.txt").exists());
    assert!(!dir.path().join("c.txt").exists());
}

#[test]
fn sibling_failure_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    write_honefile(
        dir.path(),
        r#"
engine = "local"

job "root" {
  shell = "touch root.txt"
}

job "good" {
  deps  = ["root"]
  shell = "touch good.txt"
}

job "bad" {
  deps  = ["root"]
  shell = "exit 2"
}

job "all" {
  deps = ["good", "bad"]
}
"#,
    );

    hone(dir.path()).assert().code(2);

    assert!(dir.path().join("root.txt").exists());
    assert!(dir.path().join("good.txt").exists());
}

#[test]
fn condition_skip_is_success() {
    let dir = tempfile::tempdir().unwrap();
    write_honefile(
        dir.path(),
        r#"
engine = "local"

env = {
  BRANCH = "dev"
}

job "deploy" {
  condition = "BRANCH == 'main'"
  shell     = "touch deployed.txt"
}

job "after" {
  deps  = ["deploy"]
  shell = "touch after.txt"
}
"#,
    );

    hone(dir.path())
        .arg("after")
        .assert()
        .success()
        .stdout(predicate::str::contains("condition not met"));

    // The gated executor never ran, downstream proceeded anyway.
    assert!(!dir.path().join("deployed.txt").exists());
    assert!(dir.path().join("after.txt").exists());
}

#[test]
fn default_target_is_all() {
    let dir = tempfile::tempdir().unwrap();
    write_honefile(
        dir.path(),
        r#"
engine = "local"

job "build" {
  shell = "touch built.txt"
}

job "all" {
  deps = ["build"]
}
"#,
    );

    hone(dir.path()).assert().success();
    assert!(dir.path().join("built.txt").exists());
}

#[test]
fn explicit_config_path_form() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("other.hcl"),
        r#"
engine = "local"

job "hello" {
  shell = "touch hello.txt"
}
"#,
    )
    .unwrap();

    hone(dir.path()).args(["other.hcl", "hello"]).assert().success();
    assert!(dir.path().join("hello.txt").exists());
}

#[test]
fn unknown_target_aborts_with_one() {
    let dir = tempfile::tempdir().unwrap();
    write_honefile(dir.path(), CHAIN);

    hone(dir.path()).arg("nope").assert().code(1);
}

#[test]
fn service_keeps_running_until_build_ends() {
    let dir = tempfile::tempdir().unwrap();
    write_honefile(
        dir.path(),
        r#"
engine = "local"

job "svc" {
  service = true
  shell   = "touch svc-up.txt; sleep 30"
}

job "client" {
  deps  = ["svc"]
  shell = "while [ ! -f svc-up.txt ]; do sleep 0.1; done; touch client.txt"
}
"#,
    );

    // The service starts, the client runs alongside it, and the stop
    // signal reaps the service instead of waiting out the sleep.
    hone(dir.path())
        .arg("client")
        .timeout(std::time::Duration::from_secs(20))
        .assert()
        .success();

    assert!(dir.path().join("client.txt").exists());
}
