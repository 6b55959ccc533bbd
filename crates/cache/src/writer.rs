// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log sinks returned by [`Backend::writer`](crate::Backend::writer).
//!
//! The file variant streams straight to disk. The remote variant
//! buffers in memory and uploads once at the end of the build, since an
//! object store has no append.

use crate::sign::signed_request;
use hone_core::BuildError;
use reqwest::{Client, Method};
use std::io::Write;

pub struct LogWriter {
    kind: Kind,
}

enum Kind {
    File(std::fs::File),
    Remote {
        buf: Vec<u8>,
        client: Client,
        url: String,
        access_key: String,
        secret_key: String,
    },
    Closed,
}

impl LogWriter {
    pub fn file(file: std::fs::File) -> Self {
        Self {
            kind: Kind::File(file),
        }
    }

    pub(crate) fn remote(client: Client, url: String, access_key: String, secret_key: String) -> Self {
        Self {
            kind: Kind::Remote {
                buf: Vec::new(),
                client,
                url,
                access_key,
                secret_key,
            },
        }
    }

    /// Close the sink. The file variant flushes inline; the remote
    /// variant hands back the upload to perform.
    pub fn finish(&mut self) -> Result<Option<PendingUpload>, BuildError> {
        match std::mem::replace(&mut self.kind, Kind::Closed) {
            Kind::File(mut file) => {
                file.flush()
                    .map_err(|e| BuildError::CacheIo(e.to_string()))?;
                Ok(None)
            }
            Kind::Remote {
                buf,
                client,
                url,
                access_key,
                secret_key,
            } => Ok(Some(PendingUpload {
                data: buf,
                client,
                url,
                access_key,
                secret_key,
            })),
            Kind::Closed => Ok(None),
        }
    }
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.kind {
            Kind::File(file) => file.write(buf),
            Kind::Remote { buf: sink, .. } => {
                sink.extend_from_slice(buf);
                Ok(buf.len())
            }
            Kind::Closed => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.kind {
            Kind::File(file) => file.flush(),
            _ => Ok(()),
        }
    }
}

/// The buffered remote log, ready to upload.
pub struct PendingUpload {
    data: Vec<u8>,
    client: Client,
    url: String,
    access_key: String,
    secret_key: String,
}

impl PendingUpload {
    pub async fn send(self) -> Result<(), BuildError> {
        let resp = signed_request(
            &self.client,
            Method::PUT,
            &self.url,
            &self.access_key,
            &self.secret_key,
            self.data,
        )
        .await?;

        if !resp.status().is_success() {
            return Err(BuildError::CacheIo(format!(
                "uploading log {}: {}",
                self.url,
                resp.status()
            )));
        }
        Ok(())
    }
}
