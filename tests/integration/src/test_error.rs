//! Error responses carry the right HTTP status and `<Error>` XML.

use crate::{client, spawn_default_server, test_bucket_name};

#[tokio::test]
async fn test_should_return_no_such_bucket_xml_for_missing_bucket() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();

    let resp = c.get(format!("{base}/does-not-exist")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let body = resp.text().await.unwrap();
    assert!(body.contains("<Code>NoSuchBucket</Code>"));
    assert!(body.contains("<RequestId>"));
    assert!(body.contains("<HostId>"));
}

#[tokio::test]
async fn test_should_return_no_such_key_for_missing_object() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let bucket = test_bucket_name("error");

    c.put(format!("{base}/{bucket}")).send().await.unwrap();

    let resp = c.get(format!("{base}/{bucket}/missing")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let body = resp.text().await.unwrap();
    assert!(body.contains("<Code>NoSuchKey</Code>"));
}

#[tokio::test]
async fn test_should_reject_second_create_of_same_bucket() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let bucket = test_bucket_name("dupe");

    let first = c.put(format!("{base}/{bucket}")).send().await.unwrap();
    assert_eq!(first.status(), 200);

    let second = c.put(format!("{base}/{bucket}")).send().await.unwrap();
    assert_eq!(second.status(), 409);
    let body = second.text().await.unwrap();
    assert!(body.contains("<Code>BucketAlreadyExists</Code>") || body.contains("<Code>BucketAlreadyOwnedByYou</Code>"));
}

#[tokio::test]
async fn test_should_carry_common_response_headers_on_every_response() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();

    let resp = c.get(&base).send().await.unwrap();
    assert!(resp.headers().contains_key("x-amz-request-id"));
    assert!(resp.headers().contains_key("x-amz-id-2"));
    assert_eq!(resp.headers().get("server").unwrap(), "AmazonS3");
    assert!(resp.headers().contains_key("date"));
}
