//! Bucket lifecycle: create, head, list, delete.

use crate::{client, spawn_default_server, test_bucket_name};

#[tokio::test]
async fn test_should_create_head_and_delete_bucket() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let bucket = test_bucket_name("lifecycle");

    let create = c.put(format!("{base}/{bucket}")).send().await.unwrap();
    assert_eq!(create.status(), 200);
    assert_eq!(create.headers().get("x-amz-bucket-type").unwrap(), "GeneralPurpose");

    let head = c.head(format!("{base}/{bucket}")).send().await.unwrap();
    assert_eq!(head.status(), 200);

    let delete = c.delete(format!("{base}/{bucket}")).send().await.unwrap();
    assert_eq!(delete.status(), 204);

    let head_after = c.head(format!("{base}/{bucket}")).send().await.unwrap();
    assert_eq!(head_after.status(), 404);
}

#[tokio::test]
async fn test_should_list_created_buckets() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let bucket = test_bucket_name("listbuckets");

    c.put(format!("{base}/{bucket}")).send().await.unwrap();

    let resp = c.get(&base).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains(&format!("<Name>{bucket}</Name>")));
}

#[tokio::test]
async fn test_should_resolve_virtual_hosted_bucket_addressing() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let bucket = test_bucket_name("vhost");

    c.put(format!("{base}/{bucket}")).send().await.unwrap();
    c.put(format!("{base}/{bucket}/k")).body("vhost body").send().await.unwrap();

    // Connect to the loopback address but present a virtual-hosted `Host`
    // header, the way a real client resolving `<bucket>.s3.localhost` would.
    let resp = c.get(format!("{base}/k")).header("host", format!("{bucket}.s3.localhost")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"vhost body");
}
