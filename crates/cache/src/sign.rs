// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AWS Signature Version 4 request signing for the S3 backend.
//!
//! Path-style requests with the minimal signed-header set
//! (`host;x-amz-content-sha256;x-amz-date`). Cache keys are hex digests
//! and namespace names, so canonical URIs never need extra encoding.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use hone_core::BuildError;
use reqwest::Url;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const REGION: &str = "us-east-1";
const SERVICE: &str = "s3";
const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";

pub(crate) struct Signature {
    pub amz_date: String,
    pub content_sha256: String,
    pub authorization: String,
}

/// Compute the SigV4 headers for one request.
pub(crate) fn sign(
    method: &str,
    url: &Url,
    access_key: &str,
    secret_key: &str,
    payload: &[u8],
    now: DateTime<Utc>,
) -> Result<Signature, BuildError> {
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => return Err(BuildError::CacheIo(format!("url has no host: {url}"))),
    };

    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let content_sha256 = hex::encode(Sha256::digest(payload));

    let canonical_request = format!(
        "{method}\n{path}\n{query}\nhost:{host}\nx-amz-content-sha256:{content_sha256}\nx-amz-date:{amz_date}\n\n{SIGNED_HEADERS}\n{content_sha256}",
        path = url.path(),
        query = url.query().unwrap_or(""),
    );

    let scope = format!("{date}/{REGION}/{SERVICE}/aws4_request");
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let mut key = hmac(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    key = hmac(&key, REGION.as_bytes());
    key = hmac(&key, SERVICE.as_bytes());
    key = hmac(&key, b"aws4_request");
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={access_key}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}"
    );

    Ok(Signature {
        amz_date,
        content_sha256,
        authorization,
    })
}

/// Send one signed request and map transport failures to cache errors.
pub(crate) async fn signed_request(
    client: &reqwest::Client,
    method: reqwest::Method,
    url: &str,
    access_key: &str,
    secret_key: &str,
    body: Vec<u8>,
) -> Result<reqwest::Response, BuildError> {
    let parsed = Url::parse(url).map_err(|e| BuildError::CacheIo(format!("{url}: {e}")))?;
    let sig = sign(method.as_str(), &parsed, access_key, secret_key, &body, Utc::now())?;

    client
        .request(method, parsed)
        .header("x-amz-date", sig.amz_date)
        .header("x-amz-content-sha256", sig.content_sha256)
        .header("authorization", sig.authorization)
        .body(body)
        .send()
        .await
        .map_err(|e| BuildError::CacheIo(format!("{url}: {e}")))
}

// HMAC-SHA256 accepts keys of any length, so construction cannot fail.
#[allow(clippy::expect_used)]
fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).expect("hmac accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
#[path = "sign_tests.rs"]
mod tests;
