//! `ListObjects`/`ListObjectsV2` and `ListMultipartUploads`.
//!
//! The prefix/delimiter/cursor walk runs over [`crate::storage::Backend`]
//! metadata listings rather than assuming any particular in-memory
//! collection, so it works unchanged against either storage backend.

use std::collections::BTreeSet;

use cargohold_model::error::ApiError;
use cargohold_model::input::list::{ListMultipartUploadsInput, ListObjectsInput};
use cargohold_model::output::list::{ListObjectsOutput, ObjectSummary};
use cargohold_model::output::multipart::{ListMultipartUploadsOutput, MultipartUploadSummary};
use cargohold_model::types::{BucketType, Owner};

use crate::provider::Engine;

/// The exclusive lower bound a cursor must use to skip an entire rolled-up
/// common-prefix group, not just the bare prefix string. Bumping the
/// prefix's last character to its successor yields a value every key
/// starting with `prefix` sorts below, while any later, lexicographically
/// greater key or prefix still sorts above it.
fn prefix_successor(prefix: &str) -> String {
    let mut chars: Vec<char> = prefix.chars().collect();
    if let Some(next) = chars.pop().and_then(|last| char::from_u32(last as u32 + 1)) {
        chars.push(next);
        return chars.into_iter().collect();
    }
    format!("{prefix}\u{10FFFF}")
}

/// `GET /<bucket>` (listing).
pub async fn list_objects(engine: &Engine, input: ListObjectsInput) -> Result<ListObjectsOutput, ApiError> {
    let bucket = engine.storage().get_bucket_metadata(&input.bucket).await?;

    if bucket.bucket_type == BucketType::Directory {
        validate_directory_bucket_listing(input.delimiter.as_deref(), &input.prefix)?;
    }

    let mut records = engine.storage().list_object_metadata(&input.bucket).await?;
    records.sort_by(|a, b| a.key.cmp(&b.key));

    let max_keys = if input.max_keys == 0 { ListObjectsInput::DEFAULT_MAX_KEYS } else { input.max_keys };

    let candidates = records
        .into_iter()
        .filter(|r| r.key.starts_with(&input.prefix))
        .filter(|r| match input.cursor.as_deref() {
            Some(cursor) => r.key.as_str() > cursor,
            None => true,
        });

    let mut contents = Vec::new();
    let mut common_prefixes = Vec::new();
    let mut seen_prefixes = BTreeSet::new();
    let mut is_truncated = false;
    let mut next_cursor = None;

    for record in candidates {
        if (contents.len() + common_prefixes.len()) as u32 >= max_keys {
            is_truncated = true;
            break;
        }

        let rolled_up = input.delimiter.as_deref().and_then(|delim| {
            let tail = &record.key[input.prefix.len()..];
            tail.find(delim).map(|pos| format!("{}{}", input.prefix, &tail[..=pos]))
        });

        if let Some(common_prefix) = rolled_up {
            if seen_prefixes.insert(common_prefix.clone()) {
                next_cursor = Some(prefix_successor(&common_prefix));
                common_prefixes.push(common_prefix);
            }
        } else {
            contents.push(ObjectSummary {
                key: record.key.clone(),
                last_modified: record.last_modified,
                etag: record.etag,
                size: record.size,
                owner: Owner::default(),
            });
            next_cursor = Some(record.key);
        }
    }

    Ok(ListObjectsOutput {
        name: input.bucket,
        prefix: input.prefix,
        delimiter: input.delimiter,
        max_keys,
        contents,
        common_prefixes,
        is_truncated,
        next_cursor: if is_truncated { next_cursor } else { None },
    })
}

fn validate_directory_bucket_listing(delimiter: Option<&str>, prefix: &str) -> Result<(), ApiError> {
    if let Some(delim) = delimiter {
        if !delim.is_empty() && delim != "/" {
            return Err(ApiError::InvalidArgument("only support '/' as a delimiter".to_owned()));
        }
        if !prefix.is_empty() && !delim.is_empty() && !prefix.ends_with(delim) {
            return Err(ApiError::InvalidArgument("prefixes must end with the delimiter".to_owned()));
        }
    }
    Ok(())
}

/// `GET /<bucket>?uploads`.
pub async fn list_multipart_uploads(engine: &Engine, input: ListMultipartUploadsInput) -> Result<ListMultipartUploadsOutput, ApiError> {
    engine.storage().get_bucket_metadata(&input.bucket).await?;

    let mut uploads = engine.storage().list_uploads(&input.bucket).await?;
    uploads.sort_by_key(|u| u.initiated);

    let uploads = uploads
        .into_iter()
        .map(|u| MultipartUploadSummary { key: u.key, upload_id: u.upload_id, initiated: u.initiated })
        .collect();

    Ok(ListMultipartUploadsOutput { bucket: input.bucket, uploads })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cargohold_core::GatewayConfig;
    use cargohold_model::input::bucket::CreateBucketInput;
    use cargohold_model::input::object::PutObjectInput;
    use cargohold_model::input::list::ListVersion;

    use super::*;
    use crate::ops::bucket::create_bucket;
    use crate::ops::object::put_object;
    use crate::storage::memory::MemoryBackend;

    fn test_engine() -> Engine {
        Engine::new(Arc::new(MemoryBackend::new()), GatewayConfig::default())
    }

    async fn put(engine: &Engine, bucket: &str, key: &str) {
        put_object(
            engine,
            PutObjectInput {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
                body: bytes::Bytes::from_static(b"x"),
                content_type: None,
                user_metadata: Default::default(),
                checksum_algorithm: None,
                checksum_value: None,
            },
        )
        .await
        .unwrap();
    }

    fn base_input(bucket: &str) -> ListObjectsInput {
        ListObjectsInput {
            bucket: bucket.to_owned(),
            version: ListVersion::V2,
            prefix: String::new(),
            delimiter: None,
            cursor: None,
            max_keys: ListObjectsInput::DEFAULT_MAX_KEYS,
        }
    }

    #[tokio::test]
    async fn test_should_list_keys_in_order() {
        let engine = test_engine();
        create_bucket(&engine, CreateBucketInput { bucket: "b".to_owned(), bucket_type: None, storage_class: None }).await.unwrap();
        for key in ["b.txt", "a.txt", "c.txt"] {
            put(&engine, "b", key).await;
        }
        let out = list_objects(&engine, base_input("b")).await.unwrap();
        let keys: Vec<_> = out.contents.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a.txt", "b.txt", "c.txt"]);
        assert!(!out.is_truncated);
    }

    #[tokio::test]
    async fn test_should_roll_up_common_prefixes_with_delimiter() {
        let engine = test_engine();
        create_bucket(&engine, CreateBucketInput { bucket: "photos".to_owned(), bucket_type: None, storage_class: None }).await.unwrap();
        for key in ["2023/jan.jpg", "2023/feb.jpg", "2024/jan.jpg", "readme.txt"] {
            put(&engine, "photos", key).await;
        }
        let mut input = base_input("photos");
        input.delimiter = Some("/".to_owned());
        let out = list_objects(&engine, input).await.unwrap();

        assert_eq!(out.common_prefixes, vec!["2023/".to_owned(), "2024/".to_owned()]);
        assert_eq!(out.contents.iter().map(|o| o.key.as_str()).collect::<Vec<_>>(), vec!["readme.txt"]);
    }

    #[tokio::test]
    async fn test_should_not_repeat_common_prefix_across_pages() {
        let engine = test_engine();
        create_bucket(&engine, CreateBucketInput { bucket: "photos".to_owned(), bucket_type: None, storage_class: None }).await.unwrap();
        for key in ["2023/jan.jpg", "2023/feb.jpg", "2024/jan.jpg", "readme.txt"] {
            put(&engine, "photos", key).await;
        }
        let mut input = base_input("photos");
        input.delimiter = Some("/".to_owned());
        input.max_keys = 1;
        let page1 = list_objects(&engine, input).await.unwrap();
        assert_eq!(page1.common_prefixes, vec!["2023/".to_owned()]);
        assert!(page1.is_truncated);

        let mut input2 = base_input("photos");
        input2.delimiter = Some("/".to_owned());
        input2.max_keys = 1;
        input2.cursor = page1.next_cursor;
        let page2 = list_objects(&engine, input2).await.unwrap();
        assert_eq!(page2.common_prefixes, vec!["2024/".to_owned()]);
        assert!(page2.contents.is_empty());
    }

    #[tokio::test]
    async fn test_should_filter_by_prefix() {
        let engine = test_engine();
        create_bucket(&engine, CreateBucketInput { bucket: "b".to_owned(), bucket_type: None, storage_class: None }).await.unwrap();
        for key in ["logs/a", "logs/b", "other"] {
            put(&engine, "b", key).await;
        }
        let mut input = base_input("b");
        input.prefix = "logs/".to_owned();
        let out = list_objects(&engine, input).await.unwrap();
        assert!(out.contents.iter().all(|o| o.key.starts_with("logs/")));
        assert_eq!(out.contents.len(), 2);
    }

    #[tokio::test]
    async fn test_should_paginate_with_max_keys_and_cursor() {
        let engine = test_engine();
        create_bucket(&engine, CreateBucketInput { bucket: "b".to_owned(), bucket_type: None, storage_class: None }).await.unwrap();
        for key in ["a", "b", "c", "d"] {
            put(&engine, "b", key).await;
        }
        let mut input = base_input("b");
        input.max_keys = 2;
        let page1 = list_objects(&engine, input).await.unwrap();
        assert!(page1.is_truncated);
        assert_eq!(page1.next_cursor.as_deref(), Some("b"));

        let mut input2 = base_input("b");
        input2.max_keys = 2;
        input2.cursor = page1.next_cursor;
        let page2 = list_objects(&engine, input2).await.unwrap();
        assert_eq!(page2.contents.iter().map(|o| o.key.as_str()).collect::<Vec<_>>(), vec!["c", "d"]);
        assert!(!page2.is_truncated);
    }

    #[tokio::test]
    async fn test_should_reject_non_slash_delimiter_on_directory_bucket() {
        let engine = test_engine();
        create_bucket(&engine, CreateBucketInput { bucket: "dirbucket".to_owned(), bucket_type: Some(BucketType::Directory), storage_class: None })
            .await
            .unwrap();
        let mut input = base_input("dirbucket");
        input.delimiter = Some(",".to_owned());
        let err = list_objects(&engine, input).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument(_)));
    }
}
