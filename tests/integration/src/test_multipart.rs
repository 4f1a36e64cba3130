//! Multipart upload completion and part-copy ranges.

use crate::{client, spawn_default_server, test_bucket_name};

/// Hand-build a `CompleteMultipartUpload` body for a fixed, small part list.
fn multipart_complete_body(parts: &[(u32, &str)]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><CompleteMultipartUpload>"#);
    for (number, etag) in parts {
        xml.push_str(&format!("<Part><PartNumber>{number}</PartNumber><ETag>{etag}</ETag></Part>"));
    }
    xml.push_str("</CompleteMultipartUpload>");
    xml
}

#[tokio::test]
async fn test_should_complete_two_part_multipart_upload() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let bucket = test_bucket_name("mpu");

    c.put(format!("{base}/{bucket}")).send().await.unwrap();

    let initiate = c.post(format!("{base}/{bucket}/k?uploads")).send().await.unwrap();
    assert_eq!(initiate.status(), 200);
    let initiate_body = initiate.text().await.unwrap();
    let upload_id = extract_tag(&initiate_body, "UploadId");

    let part1 = c.put(format!("{base}/{bucket}/k?partNumber=1&uploadId={upload_id}")).body("Part 1 ").send().await.unwrap();
    let etag1 = part1.headers().get("etag").unwrap().to_str().unwrap().to_owned();

    let part2 = c.put(format!("{base}/{bucket}/k?partNumber=2&uploadId={upload_id}")).body("Part 2").send().await.unwrap();
    let etag2 = part2.headers().get("etag").unwrap().to_str().unwrap().to_owned();

    let complete_body = multipart_complete_body(&[(1, &etag1), (2, &etag2)]);
    let complete = c.post(format!("{base}/{bucket}/k?uploadId={upload_id}")).body(complete_body).send().await.unwrap();
    assert_eq!(complete.status(), 200);
    let complete_body_text = complete.text().await.unwrap();
    let final_etag = extract_tag(&complete_body_text, "ETag");
    assert!(final_etag.trim_matches('"').ends_with("-2"), "final etag {final_etag} should end in -2");

    let get = c.get(format!("{base}/{bucket}/k")).send().await.unwrap();
    assert_eq!(get.bytes().await.unwrap().as_ref(), b"Part 1 Part 2");
}

#[tokio::test]
async fn test_should_copy_part_from_byte_range() {
    let (_engine, base) = spawn_default_server().await;
    let c = client();
    let src_bucket = test_bucket_name("mpu-src");
    let dst_bucket = test_bucket_name("mpu-dst");

    c.put(format!("{base}/{src_bucket}")).send().await.unwrap();
    c.put(format!("{base}/{dst_bucket}")).send().await.unwrap();
    c.put(format!("{base}/{src_bucket}/src")).body("0123456789ABCDEFGHIJ").send().await.unwrap();

    let initiate = c.post(format!("{base}/{dst_bucket}/dst?uploads")).send().await.unwrap();
    let upload_id = extract_tag(&initiate.text().await.unwrap(), "UploadId");

    let copy = c
        .put(format!("{base}/{dst_bucket}/dst?partNumber=1&uploadId={upload_id}"))
        .header("x-amz-copy-source", format!("/{src_bucket}/src"))
        .header("x-amz-copy-source-range", "bytes=5-14")
        .send()
        .await
        .unwrap();
    assert_eq!(copy.status(), 200);
    let copy_body = copy.text().await.unwrap();
    let etag = extract_tag(&copy_body, "ETag");

    let complete_body = multipart_complete_body(&[(1, &etag)]);
    let complete = c.post(format!("{base}/{dst_bucket}/dst?uploadId={upload_id}")).body(complete_body).send().await.unwrap();
    assert_eq!(complete.status(), 200);

    let get = c.get(format!("{base}/{dst_bucket}/dst")).send().await.unwrap();
    assert_eq!(get.bytes().await.unwrap().as_ref(), b"56789ABCDE");
}

fn extract_tag(xml: &str, tag: &str) -> String {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open).unwrap_or_else(|| panic!("missing <{tag}> in {xml}")) + open.len();
    let end = xml[start..].find(&close).unwrap_or_else(|| panic!("unterminated <{tag}> in {xml}"));
    xml[start..start + end].to_owned()
}
