// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local file-tree cache backend.

use crate::entry::CacheEntry;
use crate::writer::LogWriter;
use crate::Backend;
use async_trait::async_trait;
use hone_core::{hash, BuildError};
use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Cache rooted at a local directory; namespaces are subdirectories and
/// an upload is a copy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileCache {
    pub path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create the cache root. Idempotent: an existing root is success.
    pub fn init(&self) -> Result<(), BuildError> {
        std::fs::create_dir_all(&self.path)
            .map_err(|e| BuildError::CacheIo(format!("{}: {e}", self.path.display())))
    }

    fn blob_path(&self, namespace: &str, key: &str) -> PathBuf {
        self.path.join(namespace).join(key)
    }
}

fn io_err(path: &Path, e: std::io::Error) -> BuildError {
    BuildError::CacheIo(format!("{}: {e}", path.display()))
}

fn create_parents(path: &Path) -> Result<(), BuildError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }
    Ok(())
}

#[async_trait]
impl Backend for FileCache {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn get(&self, namespace: &str, entry: &CacheEntry) -> Result<(), BuildError> {
        let blob = self.blob_path(namespace, &entry.hash);
        if !blob.exists() {
            // Absent blob is a miss, not an error.
            return Ok(());
        }

        let dest = Path::new(&entry.filename);
        create_parents(dest)?;
        std::fs::copy(&blob, dest).map_err(|e| io_err(dest, e))?;
        Ok(())
    }

    async fn set(&self, namespace: &str, path: &Path) -> Result<CacheEntry, BuildError> {
        let content_hash = hash::hash_file(path)?;
        let blob = self.blob_path(namespace, &content_hash);

        if !blob.exists() {
            create_parents(&blob)?;
            std::fs::copy(path, &blob).map_err(|e| io_err(&blob, e))?;
        }

        CacheEntry::with_hash(path, content_hash)
    }

    async fn load_manifest(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<CacheEntry>>, BuildError> {
        let path = self.blob_path(namespace, key);
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(&path, e)),
        };

        let entries = serde_json::from_slice(&data)
            .map_err(|e| BuildError::CacheIo(format!("{}: {e}", path.display())))?;
        Ok(Some(entries))
    }

    async fn dump_manifest(
        &self,
        namespace: &str,
        key: &str,
        entries: &[CacheEntry],
    ) -> Result<(), BuildError> {
        let path = self.blob_path(namespace, key);
        create_parents(&path)?;

        let data = serde_json::to_vec(entries).map_err(|e| BuildError::CacheIo(e.to_string()))?;

        // Write-then-rename so a concurrent reader never sees a torn
        // manifest.
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, data).map_err(|e| io_err(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
        Ok(())
    }

    fn writer(&self, namespace: &str, path: &str) -> Result<(LogWriter, String), BuildError> {
        let dest = self.path.join(namespace).join(path);
        create_parents(&dest)?;
        let file = std::fs::File::create(&dest).map_err(|e| io_err(&dest, e))?;
        let url = format!("file://{}", dest.display());
        Ok((LogWriter::file(file), url))
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
