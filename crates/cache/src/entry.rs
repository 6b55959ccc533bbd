// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cache entries: one cached file identified by its workspace path and
//! content hash.

use hone_core::{hash, BuildError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, SystemTime};

/// One cached file. Field names are capitalized on the wire for
/// compatibility with existing manifests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// On-disk path, relative to the workspace root.
    #[serde(rename = "Filename")]
    pub filename: String,
    /// Hex SHA-256 of the file's bytes; the blob key.
    #[serde(rename = "Hash")]
    pub hash: String,
    /// Unix permission bits, restored on download.
    #[serde(rename = "Mode", default = "default_mode")]
    pub mode: u32,
    /// Modification time in seconds since the epoch, restored on download.
    #[serde(rename = "Mtime", default)]
    pub mtime: i64,
}

fn default_mode() -> u32 {
    0o644
}

impl CacheEntry {
    /// Build an entry for an on-disk file, hashing its contents.
    pub fn for_path(path: &Path) -> Result<Self, BuildError> {
        let content_hash = hash::hash_file(path)?;
        Self::with_hash(path, content_hash)
    }

    /// Build an entry when the content hash is already known.
    pub fn with_hash(path: &Path, content_hash: String) -> Result<Self, BuildError> {
        let meta = std::fs::metadata(path)
            .map_err(|e| BuildError::CacheIo(format!("{}: {e}", path.display())))?;

        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Ok(Self {
            filename: path.to_string_lossy().into_owned(),
            hash: content_hash,
            mode: mode_of(&meta),
            mtime,
        })
    }

    /// Restore the recorded mode and mtime onto the downloaded file.
    pub fn sync_attrs(&self) -> Result<(), BuildError> {
        let io_err = |e: std::io::Error| BuildError::CacheIo(format!("{}: {e}", self.filename));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.filename, std::fs::Permissions::from_mode(self.mode))
                .map_err(io_err)?;
        }

        let file = std::fs::OpenOptions::new()
            .write(true)
            .open(&self.filename)
            .map_err(io_err)?;
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(self.mtime.max(0) as u64);
        file.set_times(std::fs::FileTimes::new().set_modified(mtime))
            .map_err(io_err)?;

        Ok(())
    }
}

fn mode_of(meta: &std::fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o7777
    }
    #[cfg(not(unix))]
    {
        let _ = meta;
        default_mode()
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
