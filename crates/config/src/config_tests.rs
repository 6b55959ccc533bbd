// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const HONEFILE: &str = r#"
engine = "local"

env = {
  BRANCH = "master"
}

cache {
  file {
    path = ".cache-test"
  }

  s3 {
    bucket     = "builds"
    endpoint   = "cache.internal:9000"
    access_key = "AKID"
    secret_key = "secret"
  }
}

template "default" {
  env = {
    CC = "gcc"
  }
}

job "fetch" {
  shell  = "git fetch"
  output = "FETCH_HEAD"
}

job "build" {
  deps    = ["fetch"]
  shell   = "make"
  inputs  = ["src/**"]
  outputs = ["bin/out"]
}

scm "github" {
  token = "tok"
}
"#;

#[test]
fn parses_hcl_honefile() {
    let mut config = Config::parse_str(HONEFILE, Format::Hcl).unwrap();

    assert_eq!(config.engine(), "local");
    assert_eq!(config.cache.file.path, std::path::PathBuf::from(".cache-test"));

    let s3 = config.cache.s3.as_ref().unwrap();
    assert_eq!(s3.bucket, "builds");
    assert!(!s3.disabled);

    let jobs = config.take_jobs();
    assert_eq!(jobs.len(), 2);
    let build = jobs.iter().find(|j| j.name == "build").unwrap();
    assert_eq!(build.deps, Some(vec!["fetch".to_string()]));
    assert_eq!(build.all_outputs(), vec!["bin/out"]);

    let scms = config.take_scms();
    assert_eq!(scms.len(), 1);
    assert_eq!(scms[0].name, "github");
    assert_eq!(scms[0].token, "tok");
}

#[test]
fn template_fills_unset_fields() {
    let config = Config::parse_str(HONEFILE, Format::Hcl).unwrap();
    let build = &config.job["build"];

    // From the default template's env merge.
    assert_eq!(build.env.as_ref().unwrap()["CC"], "gcc");
}

#[test]
fn config_env_overrides_process_env() {
    std::env::set_var("HONE_TEST_BRANCH_VAR", "from-process");

    let config = Config::parse_str(
        "env = {\n  HONE_TEST_BRANCH_VAR = \"from-config\"\n}\n",
        Format::Hcl,
    )
    .unwrap();

    assert_eq!(config.env["HONE_TEST_BRANCH_VAR"], "from-config");
    std::env::remove_var("HONE_TEST_BRANCH_VAR");
}

#[test]
fn process_env_is_visible() {
    std::env::set_var("HONE_TEST_INHERITED_VAR", "inherited");

    let config = Config::parse_str("", Format::Hcl).unwrap();

    assert_eq!(config.env["HONE_TEST_INHERITED_VAR"], "inherited");
    std::env::remove_var("HONE_TEST_INHERITED_VAR");
}

#[test]
fn default_cache_path_applied() {
    let config = Config::parse_str("", Format::Hcl).unwrap();
    assert_eq!(config.cache.file.path, std::path::PathBuf::from(DEFAULT_CACHE_DIR));
}

#[test]
fn default_engine_is_local() {
    let config = Config::parse_str("", Format::Hcl).unwrap();
    assert_eq!(config.engine(), "local");
}

#[test]
fn validation_rejects_containerless_docker_job() {
    let content = r#"
engine = "docker"

job "build" {
  shell = "make"
}
"#;

    let err = Config::parse_str(content, Format::Hcl).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid(BuildError::InvalidJob { .. })
    ));
}

#[test]
fn validation_rejects_shell_and_exec() {
    let content = r#"
job "build" {
  shell = "make"
  exec  = ["make"]
}
"#;

    let err = Config::parse_str(content, Format::Hcl).unwrap_err();
    assert!(err.to_string().contains("mutually exclusive"));
}

#[test]
fn parse_error_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Honefile");
    std::fs::write(&path, "job \"x\" {").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("Honefile"));
}

#[test]
fn missing_file_is_io_error() {
    let err = Config::load("/nonexistent/Honefile").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn parses_toml_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("build.toml");
    std::fs::write(
        &path,
        r#"
engine = "local"

[job.build]
shell = "make"

[job.test]
deps = ["build"]
shell = "make test"
"#,
    )
    .unwrap();

    let mut config = Config::load(&path).unwrap();
    let jobs = config.take_jobs();
    assert_eq!(jobs.len(), 2);
}

#[test]
fn take_jobs_is_sorted_by_name() {
    let content = r#"
job "zeta" {
  shell = "true"
}

job "alpha" {
  shell = "true"
}
"#;

    let mut config = Config::parse_str(content, Format::Hcl).unwrap();
    let names: Vec<_> = config.take_jobs().iter().map(|j| j.name.clone()).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}
