//! Single-shot put/get and checksum computation.

use crate::{client, spawn_default_server, test_bucket_name};

#[tokio::test]
async fn test_should_round_trip_hello_world_put_get() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let bucket = test_bucket_name("object");

    c.put(format!("{base}/{bucket}")).send().await.unwrap();

    let put = c.put(format!("{base}/{bucket}/k")).body("Hello World").send().await.unwrap();
    assert_eq!(put.status(), 200);
    assert_eq!(put.headers().get("etag").unwrap(), "\"b10a8db164e0754105b7a99be72e3fe5\"");

    let get = c.get(format!("{base}/{bucket}/k")).send().await.unwrap();
    assert_eq!(get.status(), 200);
    assert_eq!(get.headers().get("etag").unwrap(), "\"b10a8db164e0754105b7a99be72e3fe5\"");
    assert_eq!(get.headers().get("content-length").unwrap(), "11");
    let body = get.bytes().await.unwrap();
    assert_eq!(&body[..], b"Hello World");
}

#[tokio::test]
async fn test_should_compute_crc32_checksum_on_put() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let bucket = test_bucket_name("checksum");

    c.put(format!("{base}/{bucket}")).send().await.unwrap();

    let put = c
        .put(format!("{base}/{bucket}/k"))
        .header("x-amz-checksum-algorithm", "CRC32")
        .body("Hello World")
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), 200);
    assert_eq!(put.headers().get("x-amz-checksum-crc32").unwrap(), "ShexVg==");
}

#[tokio::test]
async fn test_should_have_head_headers_match_get_minus_body() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let bucket = test_bucket_name("head");

    c.put(format!("{base}/{bucket}")).send().await.unwrap();
    c.put(format!("{base}/{bucket}/k")).body("payload bytes").send().await.unwrap();

    let get = c.get(format!("{base}/{bucket}/k")).send().await.unwrap();
    let get_etag = get.headers().get("etag").cloned().unwrap();
    let get_len = get.headers().get("content-length").cloned().unwrap();
    let _ = get.bytes().await.unwrap();

    let head = c.head(format!("{base}/{bucket}/k")).send().await.unwrap();
    assert_eq!(head.status(), 200);
    assert_eq!(head.headers().get("etag").unwrap(), &get_etag);
    assert_eq!(head.headers().get("content-length").unwrap(), &get_len);
    assert!(head.bytes().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_should_support_ranged_get() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let bucket = test_bucket_name("range");

    c.put(format!("{base}/{bucket}")).send().await.unwrap();
    c.put(format!("{base}/{bucket}/k")).body("0123456789").send().await.unwrap();

    let resp = c.get(format!("{base}/{bucket}/k")).header("range", "bytes=2-5").send().await.unwrap();
    assert_eq!(resp.status(), 206);
    assert_eq!(resp.headers().get("content-range").unwrap(), "bytes 2-5/10");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"2345");
}
