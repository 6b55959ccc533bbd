// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 12, 30, 0).unwrap()
}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[test]
fn signature_headers_have_expected_shape() {
    let sig = sign(
        "PUT",
        &url("https://cache.internal:9000/bucket/srcs/abcd"),
        "AKID",
        "secret",
        b"payload",
        fixed_time(),
    )
    .unwrap();

    assert_eq!(sig.amz_date, "20260504T123000Z");
    assert_eq!(sig.content_sha256, hex::encode(Sha256::digest(b"payload")));
    assert!(sig
        .authorization
        .starts_with("AWS4-HMAC-SHA256 Credential=AKID/20260504/us-east-1/s3/aws4_request"));
    assert!(sig
        .authorization
        .contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
    assert!(sig.authorization.contains("Signature="));
}

#[test]
fn signature_is_deterministic() {
    let a = sign("GET", &url("https://h/b/k"), "AKID", "secret", b"", fixed_time()).unwrap();
    let b = sign("GET", &url("https://h/b/k"), "AKID", "secret", b"", fixed_time()).unwrap();
    assert_eq!(a.authorization, b.authorization);
}

#[test]
fn signature_covers_method_path_and_payload() {
    let base = sign("GET", &url("https://h/b/k"), "AKID", "secret", b"", fixed_time()).unwrap();

    let other_method =
        sign("PUT", &url("https://h/b/k"), "AKID", "secret", b"", fixed_time()).unwrap();
    let other_path =
        sign("GET", &url("https://h/b/k2"), "AKID", "secret", b"", fixed_time()).unwrap();
    let other_payload =
        sign("GET", &url("https://h/b/k"), "AKID", "secret", b"x", fixed_time()).unwrap();

    assert_ne!(base.authorization, other_method.authorization);
    assert_ne!(base.authorization, other_path.authorization);
    assert_ne!(base.authorization, other_payload.authorization);
}

#[test]
fn host_includes_nonstandard_port() {
    // The signed host must match what the client sends; reqwest keeps
    // the port for nonstandard ports only.
    let with_port = sign(
        "GET",
        &url("https://h:9000/b/k"),
        "AKID",
        "secret",
        b"",
        fixed_time(),
    )
    .unwrap();
    let without = sign("GET", &url("https://h/b/k"), "AKID", "secret", b"", fixed_time()).unwrap();

    assert_ne!(with_port.authorization, without.authorization);
}
