//! Presigned URL expiration.

use cargohold_auth::canonical::{build_canonical_request, build_signed_headers_string};
use cargohold_auth::sigv4::{build_string_to_sign, compute_signature, derive_signing_key, hash_payload};
use cargohold_core::{AuthenticationConfig, BucketPermission, GatewayConfig, Permission, S3User};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use sha2::Digest;

use crate::{client, spawn_server, test_bucket_name};

const ACCESS_KEY: &str = "AKIDTEST";
const SECRET_KEY: &str = "secret123";
const REGION: &str = "us-east-1";
const SERVICE: &str = "s3";

fn authenticated_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.authentication = AuthenticationConfig {
        enabled: true,
        users: vec![S3User {
            access_key_id: ACCESS_KEY.to_owned(),
            secret_access_key: SECRET_KEY.to_owned(),
            name: "test".to_owned(),
            bucket_permissions: vec![BucketPermission { bucket_name: "*".to_owned(), permissions: vec![Permission::All] }],
        }],
    };
    config
}

/// Sign a request with a header-based `Authorization` value.
fn authorization_header(method: &str, path: &str, host: &str, timestamp: &str, body: &[u8]) -> String {
    let date = &timestamp[..8];
    let body_hash = hash_payload(body);
    let headers = [("host", host), ("x-amz-date", timestamp)];
    let signed = ["host", "x-amz-date"];
    let signed_headers = build_signed_headers_string(&signed);
    let canonical_request = build_canonical_request(method, path, "", &headers, &signed, &body_hash);
    let canonical_hash = hex::encode(sha2::Sha256::digest(canonical_request.as_bytes()));
    let credential_scope = format!("{date}/{REGION}/{SERVICE}/aws4_request");
    let string_to_sign = build_string_to_sign(timestamp, &credential_scope, &canonical_hash);
    let signing_key = derive_signing_key(SECRET_KEY, date, REGION, SERVICE);
    let signature = compute_signature(&signing_key, &string_to_sign);
    format!("AWS4-HMAC-SHA256 Credential={ACCESS_KEY}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}")
}

fn now_amz_date() -> String {
    chrono::Utc::now().format("%Y%m%dT%H%M%SZ").to_string()
}

/// Build a presigned GET URL for `path`, valid for `expires_seconds`.
fn presigned_get_url(base: &str, host: &str, path: &str, expires_seconds: u64) -> String {
    let timestamp = now_amz_date();
    let date = &timestamp[..8];
    let credential = format!("{ACCESS_KEY}/{date}/{REGION}/{SERVICE}/aws4_request");
    let encoded_credential = utf8_percent_encode(&credential, NON_ALPHANUMERIC).to_string();

    let query = format!(
        "X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Credential={encoded_credential}&X-Amz-Date={timestamp}&X-Amz-Expires={expires_seconds}&X-Amz-SignedHeaders=host"
    );

    let headers = [("host", host)];
    let signed = ["host"];
    let canonical_request = build_canonical_request("GET", path, &query, &headers, &signed, "UNSIGNED-PAYLOAD");
    let canonical_hash = hex::encode(sha2::Sha256::digest(canonical_request.as_bytes()));
    let credential_scope = format!("{date}/{REGION}/{SERVICE}/aws4_request");
    let string_to_sign = build_string_to_sign(&timestamp, &credential_scope, &canonical_hash);
    let signing_key = derive_signing_key(SECRET_KEY, date, REGION, SERVICE);
    let signature = compute_signature(&signing_key, &string_to_sign);

    format!("{base}{path}?{query}&X-Amz-Signature={signature}")
}

#[tokio::test]
async fn test_should_reject_expired_presigned_url() {
    let (_engine, base) = spawn_server(authenticated_config()).await;
    let c = client();
    let bucket = test_bucket_name("presign");
    let host = base.trim_start_matches("http://");

    let timestamp = now_amz_date();
    let create = c
        .put(format!("{base}/{bucket}"))
        .header("host", host)
        .header("x-amz-date", &timestamp)
        .header("authorization", authorization_header("PUT", &format!("/{bucket}"), host, &timestamp, b""))
        .send()
        .await
        .unwrap();
    assert_eq!(create.status(), 200, "bucket creation should succeed: {:?}", create.text().await);

    let put_timestamp = now_amz_date();
    let put = c
        .put(format!("{base}/{bucket}/k"))
        .header("host", host)
        .header("x-amz-date", &put_timestamp)
        .header("authorization", authorization_header("PUT", &format!("/{bucket}/k"), host, &put_timestamp, b"hello"))
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), 200, "object put should succeed: {:?}", put.text().await);

    let url = presigned_get_url(&base, host, &format!("/{bucket}/k"), 1);
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;

    let resp = c.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 403);
    let body = resp.text().await.unwrap();
    assert!(body.contains("<Code>RequestTimeTooSkewed</Code>"));
    assert!(body.contains("Presigned URL has expired"));
}

#[tokio::test]
async fn test_should_accept_a_still_valid_presigned_url() {
    let (_engine, base) = spawn_server(authenticated_config()).await;
    let c = client();
    let bucket = test_bucket_name("presign-ok");
    let host = base.trim_start_matches("http://");

    let timestamp = now_amz_date();
    c.put(format!("{base}/{bucket}"))
        .header("host", host)
        .header("x-amz-date", &timestamp)
        .header("authorization", authorization_header("PUT", &format!("/{bucket}"), host, &timestamp, b""))
        .send()
        .await
        .unwrap();

    let put_timestamp = now_amz_date();
    c.put(format!("{base}/{bucket}/k"))
        .header("host", host)
        .header("x-amz-date", &put_timestamp)
        .header("authorization", authorization_header("PUT", &format!("/{bucket}/k"), host, &put_timestamp, b"hello"))
        .body("hello")
        .send()
        .await
        .unwrap();

    let url = presigned_get_url(&base, host, &format!("/{bucket}/k"), 300);
    let resp = c.get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 200, "body: {:?}", resp.text().await);
}
