// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S3-compatible object-store cache backend.

use crate::entry::CacheEntry;
use crate::sign::signed_request;
use crate::writer::LogWriter;
use crate::Backend;
use async_trait::async_trait;
use hone_core::BuildError;
use reqwest::{Certificate, Client, Method, StatusCode};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::Path;

/// Remote cache in an S3-compatible bucket.
///
/// `endpoint` may carry a scheme; without one it defaults to https.
/// `CA_FILE` in the environment adds a root certificate for private
/// endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Cache {
    pub bucket: String,
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(skip)]
    client: Option<Client>,
}

impl S3Cache {
    /// Build from the shim environment contract (`S3_BUCKET`,
    /// `S3_ENDPOINT`, `S3_ACCESS_KEY`, `S3_SECRET_KEY`).
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        Self {
            bucket: var("S3_BUCKET"),
            endpoint: var("S3_ENDPOINT"),
            access_key: var("S3_ACCESS_KEY"),
            secret_key: var("S3_SECRET_KEY"),
            disabled: false,
            client: None,
        }
    }

    /// Connect and create the bucket if absent. Idempotent: an existing
    /// bucket is success.
    pub async fn init(&mut self) -> Result<(), BuildError> {
        let mut builder = Client::builder().use_rustls_tls();

        if let Ok(ca_file) = std::env::var("CA_FILE") {
            if !ca_file.is_empty() {
                let pem = std::fs::read(&ca_file)
                    .map_err(|e| BuildError::CacheIo(format!("{ca_file}: {e}")))?;
                let cert = Certificate::from_pem(&pem)
                    .map_err(|e| BuildError::CacheIo(format!("{ca_file}: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
        }

        let client = builder
            .build()
            .map_err(|e| BuildError::CacheIo(e.to_string()))?;
        self.client = Some(client);

        let bucket_url = format!("{}/{}", self.base_url(), self.bucket);
        let resp = self.send(Method::PUT, &bucket_url, Vec::new()).await?;
        match resp.status() {
            status if status.is_success() => {}
            StatusCode::CONFLICT => {
                // BucketAlreadyOwnedByYou / BucketAlreadyExists
            }
            status => {
                let head = self.send(Method::HEAD, &bucket_url, Vec::new()).await?;
                if !head.status().is_success() {
                    return Err(BuildError::CacheIo(format!(
                        "creating bucket {}: {status}",
                        self.bucket
                    )));
                }
            }
        }

        tracing::info!(bucket = %self.bucket, endpoint = %self.endpoint, "initialized s3 cache");
        Ok(())
    }

    fn base_url(&self) -> String {
        let endpoint = self.endpoint.trim_end_matches('/');
        if endpoint.contains("://") {
            endpoint.to_string()
        } else {
            format!("https://{endpoint}")
        }
    }

    fn object_url(&self, namespace: &str, key: &str) -> String {
        format!("{}/{}/{}/{}", self.base_url(), self.bucket, namespace, key)
    }

    fn client(&self) -> Result<&Client, BuildError> {
        self.client
            .as_ref()
            .ok_or_else(|| BuildError::CacheIo("s3 cache not initialized".into()))
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Vec<u8>,
    ) -> Result<reqwest::Response, BuildError> {
        signed_request(self.client()?, method, url, &self.access_key, &self.secret_key, body).await
    }
}

#[async_trait]
impl Backend for S3Cache {
    fn name(&self) -> &'static str {
        "s3"
    }

    fn env(&self) -> HashMap<String, String> {
        [
            ("S3_BUCKET", &self.bucket),
            ("S3_ENDPOINT", &self.endpoint),
            ("S3_ACCESS_KEY", &self.access_key),
            ("S3_SECRET_KEY", &self.secret_key),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
    }

    async fn get(&self, namespace: &str, entry: &CacheEntry) -> Result<(), BuildError> {
        let url = self.object_url(namespace, &entry.hash);
        let resp = self.send(Method::GET, &url, Vec::new()).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            // Absent blob is a miss, not an error.
            return Ok(());
        }
        if !resp.status().is_success() {
            return Err(BuildError::CacheIo(format!("{url}: {}", resp.status())));
        }

        let data = resp
            .bytes()
            .await
            .map_err(|e| BuildError::CacheIo(format!("{url}: {e}")))?;

        let dest = Path::new(&entry.filename);
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| BuildError::CacheIo(format!("{}: {e}", parent.display())))?;
            }
        }
        std::fs::write(dest, &data)
            .map_err(|e| BuildError::CacheIo(format!("{}: {e}", dest.display())))?;
        Ok(())
    }

    async fn set(&self, namespace: &str, path: &Path) -> Result<CacheEntry, BuildError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| BuildError::CacheIo(format!("{}: {e}", path.display())))?;
        let content_hash = hex::encode(Sha256::digest(&data));

        let url = self.object_url(namespace, &content_hash);
        let head = self.send(Method::HEAD, &url, Vec::new()).await?;
        if !head.status().is_success() {
            let resp = self.send(Method::PUT, &url, data).await?;
            if !resp.status().is_success() {
                return Err(BuildError::CacheIo(format!("{url}: {}", resp.status())));
            }
        }

        CacheEntry::with_hash(path, content_hash)
    }

    async fn load_manifest(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<Vec<CacheEntry>>, BuildError> {
        let url = self.object_url(namespace, key);
        let resp = self.send(Method::GET, &url, Vec::new()).await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(BuildError::CacheIo(format!("{url}: {}", resp.status())));
        }

        let data = resp
            .bytes()
            .await
            .map_err(|e| BuildError::CacheIo(format!("{url}: {e}")))?;
        let entries = serde_json::from_slice(&data)
            .map_err(|e| BuildError::CacheIo(format!("{url}: {e}")))?;
        Ok(Some(entries))
    }

    async fn dump_manifest(
        &self,
        namespace: &str,
        key: &str,
        entries: &[CacheEntry],
    ) -> Result<(), BuildError> {
        let data = serde_json::to_vec(entries).map_err(|e| BuildError::CacheIo(e.to_string()))?;
        let url = self.object_url(namespace, key);
        let resp = self.send(Method::PUT, &url, data).await?;
        if !resp.status().is_success() {
            return Err(BuildError::CacheIo(format!("{url}: {}", resp.status())));
        }
        Ok(())
    }

    fn writer(&self, namespace: &str, path: &str) -> Result<(LogWriter, String), BuildError> {
        let url = self.object_url(namespace, path);
        let writer = LogWriter::remote(
            self.client()?.clone(),
            url.clone(),
            self.access_key.clone(),
            self.secret_key.clone(),
        );
        Ok((writer, url))
    }
}
