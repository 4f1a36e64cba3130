//! Prefix + delimiter listing.

use crate::{client, spawn_default_server, test_bucket_name};

#[tokio::test]
async fn test_should_group_keys_by_delimiter_under_prefix() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let bucket = test_bucket_name("list");

    c.put(format!("{base}/{bucket}")).send().await.unwrap();

    for key in [
        "photos/2021/jan/1.jpg",
        "photos/2021/feb/2.jpg",
        "photos/2022/mar/3.jpg",
        "photos/readme.txt",
    ] {
        c.put(format!("{base}/{bucket}/{key}")).body("x").send().await.unwrap();
    }

    let resp = c.get(format!("{base}/{bucket}?prefix=photos/&delimiter=/")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();

    assert!(body.contains("<Key>photos/readme.txt</Key>"));
    assert!(!body.contains("<Key>photos/2021/jan/1.jpg</Key>"));
    assert!(body.contains("<Prefix>photos/2021/</Prefix>"));
    assert!(body.contains("<Prefix>photos/2022/</Prefix>"));
}

#[tokio::test]
async fn test_should_truncate_and_paginate_with_max_keys() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let bucket = test_bucket_name("paginate");

    c.put(format!("{base}/{bucket}")).send().await.unwrap();
    for i in 0..5 {
        c.put(format!("{base}/{bucket}/k{i}")).body("x").send().await.unwrap();
    }

    let resp = c.get(format!("{base}/{bucket}?max-keys=2")).send().await.unwrap();
    let body = resp.text().await.unwrap();
    assert!(body.contains("<IsTruncated>true</IsTruncated>"));
    assert_eq!(body.matches("<Key>").count(), 2);
}
