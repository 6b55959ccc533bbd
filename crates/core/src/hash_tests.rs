// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::job::Job;
use std::io::Write;

fn base_job() -> Job {
    Job {
        name: "build".into(),
        image: Some("rust:1.80".into()),
        shell: Some("cargo build".into()),
        inputs: Some(vec!["src/**".into(), "Cargo.toml".into()]),
        outputs: Some(vec!["target/out".into()]),
        env: Some(
            [
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "2".to_string()),
            ]
            .into_iter()
            .collect(),
        ),
        deps: Some(vec!["fetch".into(), "gen".into()]),
        ..Job::default()
    }
}

#[test]
fn fingerprint_is_deterministic() {
    assert_eq!(fingerprint(&base_job()), fingerprint(&base_job()));
}

#[test]
fn fingerprint_ignores_input_and_dep_order() {
    let mut reordered = base_job();
    reordered.inputs = Some(vec!["Cargo.toml".into(), "src/**".into()]);
    reordered.deps = Some(vec!["gen".into(), "fetch".into()]);

    assert_eq!(fingerprint(&base_job()), fingerprint(&reordered));
}

#[test]
fn fingerprint_ignores_template_engine_and_error() {
    let mut j = base_job();
    j.template = Some("release".into());
    j.engine = Some("docker".into());
    j.fail(crate::BuildError::MissingInput("x".into()));

    assert_eq!(fingerprint(&base_job()), fingerprint(&j));
}

#[test]
fn fingerprint_changes_with_shell() {
    let mut j = base_job();
    j.shell = Some("cargo build --release".into());
    assert_ne!(fingerprint(&base_job()), fingerprint(&j));
}

#[test]
fn fingerprint_changes_with_env_value() {
    let mut j = base_job();
    j.env.as_mut().unwrap().insert("A".into(), "changed".into());
    assert_ne!(fingerprint(&base_job()), fingerprint(&j));
}

#[test]
fn fingerprint_unifies_singular_and_plural_forms() {
    // `input = "x"` and `inputs = ["x"]` hash the same: the fingerprint
    // covers the union, not the spelling.
    let mut singular = base_job();
    singular.inputs = None;
    singular.input = Some("src".into());

    let mut plural = base_job();
    plural.inputs = Some(vec!["src".into()]);
    plural.input = None;

    assert_eq!(fingerprint(&singular), fingerprint(&plural));
}

#[test]
fn cache_key_is_hex_sha256() {
    let key = cache_key(&base_job());
    assert_eq!(key.len(), 64);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn job_id_stable_for_name() {
    assert_eq!(job_id("build"), job_id("build"));
    assert_ne!(job_id("build"), job_id("test"));
}

#[test]
fn hash_file_of_known_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(b"hello").unwrap();

    // sha256("hello")
    assert_eq!(
        hash_file(&path).unwrap(),
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
}

#[test]
fn hash_file_missing_is_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let err = hash_file(&dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, BuildError::MissingInput(_)));
}

#[test]
fn hash_file_ignores_mtime() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data");
    std::fs::write(&path, b"content").unwrap();
    let first = hash_file(&path).unwrap();

    let file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
    file.set_times(
        std::fs::FileTimes::new().set_modified(std::time::SystemTime::UNIX_EPOCH),
    )
    .unwrap();

    assert_eq!(first, hash_file(&path).unwrap());
}
