// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn wire_field_names_are_capitalized() {
    let entry = CacheEntry {
        filename: "target/out".into(),
        hash: "abc123".into(),
        mode: 0o755,
        mtime: 1700000000,
    };

    let value = serde_json::to_value(&entry).unwrap();
    assert_eq!(value["Filename"], "target/out");
    assert_eq!(value["Hash"], "abc123");
    assert_eq!(value["Mode"], 0o755);
    assert_eq!(value["Mtime"], 1700000000);
}

#[test]
fn decodes_manifests_without_attr_fields() {
    // Manifests written before attributes were recorded carry only the
    // identifying pair.
    let entries: Vec<CacheEntry> =
        serde_json::from_str(r#"[{"Filename": "a.txt", "Hash": "deadbeef"}]"#).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].filename, "a.txt");
    assert_eq!(entries[0].hash, "deadbeef");
    assert_eq!(entries[0].mode, 0o644);
    assert_eq!(entries[0].mtime, 0);
}

#[test]
fn for_path_records_content_hash() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    std::fs::write(&path, b"hello").unwrap();

    let entry = CacheEntry::for_path(&path).unwrap();

    assert_eq!(
        entry.hash,
        "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
    assert_eq!(entry.filename, path.to_string_lossy());
}

#[cfg(unix)]
#[test]
fn sync_attrs_restores_mode_and_mtime() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tool.sh");
    std::fs::write(&path, b"#!/bin/sh\n").unwrap();

    let entry = CacheEntry {
        filename: path.to_string_lossy().into_owned(),
        hash: String::new(),
        mode: 0o755,
        mtime: 1600000000,
    };
    entry.sync_attrs().unwrap();

    let meta = std::fs::metadata(&path).unwrap();
    assert_eq!(meta.permissions().mode() & 0o7777, 0o755);
    let mtime = meta
        .modified()
        .unwrap()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    assert_eq!(mtime, 1600000000);
}
