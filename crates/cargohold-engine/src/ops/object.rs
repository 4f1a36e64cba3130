//! Single-object operation handlers: put, copy, get, delete.
//!
//! Built around [`crate::storage::Backend`]'s stream-based data methods
//! rather than direct byte-buffer storage calls, so large bodies never need
//! to be fully buffered in memory.

use bytes::Bytes;
use cargohold_model::error::ApiError;
use cargohold_model::input::object::{CopyObjectInput, DeleteObjectInput, GetObjectInput, MetadataDirective, PutObjectInput};
use cargohold_model::output::object::{CopyObjectOutput, GetObjectOutput, PutObjectOutput};
use cargohold_model::types::{ChecksumMap, ObjectRecord};
use chrono::Utc;
use futures::stream;
use futures::stream::StreamExt;

use crate::provider::Engine;
use crate::storage::{self, ByteStream};
use crate::validation::validate_object_key;

fn bytes_to_stream(data: Bytes) -> ByteStream {
    stream::once(async move { Ok(data) }).boxed()
}

/// Guess a `Content-Type` from the object key's extension, falling back to
/// `application/octet-stream` when the client didn't supply one.
fn default_content_type(key: &str) -> String {
    mime_guess::from_path(key).first_or_octet_stream().to_string()
}

/// `PUT /<bucket>/<key>` (no copy source).
pub async fn put_object(engine: &Engine, input: PutObjectInput) -> Result<PutObjectOutput, ApiError> {
    engine.storage().get_bucket_metadata(&input.bucket).await?;
    validate_object_key(&input.key)?;

    let algorithms: Vec<_> = input.checksum_algorithm.into_iter().collect();
    let write = engine
        .storage()
        .store_object_data(&input.bucket, &input.key, bytes_to_stream(input.body), &algorithms)
        .await?;

    let checksums: ChecksumMap = storage::checksums_from_pairs(write.checksums);

    if let (Some(algo), Some(expected)) = (input.checksum_algorithm, input.checksum_value.as_ref()) {
        if checksums.get(&algo) != Some(expected) {
            let _ = engine.storage().delete_object_data(&input.bucket, &input.key).await;
            return Err(ApiError::InvalidChecksum);
        }
    }

    let record = ObjectRecord {
        key: input.key.clone(),
        bucket: input.bucket.clone(),
        size: write.size,
        last_modified: Utc::now(),
        etag: format!("\"{}\"", write.md5_hex),
        content_type: input.content_type.unwrap_or_else(|| default_content_type(&input.key)),
        user_metadata: input.user_metadata,
        checksums: checksums.clone(),
    };
    engine.storage().store_object_metadata(&record).await?;

    Ok(PutObjectOutput { etag: record.etag, checksums })
}

/// `PUT /<bucket>/<key>` with `x-amz-copy-source`.
pub async fn copy_object(engine: &Engine, input: CopyObjectInput) -> Result<CopyObjectOutput, ApiError> {
    engine.storage().get_bucket_metadata(&input.bucket).await?;
    validate_object_key(&input.key)?;

    let source = engine.storage().get_object_metadata(&input.source_bucket, &input.source_key).await?;
    let data = engine.storage().get_object_data(&input.source_bucket, &input.source_key).await?;

    let algorithms: Vec<_> = source.checksums.keys().copied().collect();
    let write = engine
        .storage()
        .store_object_data(&input.bucket, &input.key, bytes_to_stream(data), &algorithms)
        .await?;
    let checksums: ChecksumMap = storage::checksums_from_pairs(write.checksums);

    let (content_type, user_metadata) = match input.metadata_directive {
        MetadataDirective::Copy => (source.content_type, source.user_metadata),
        MetadataDirective::Replace => (input.content_type.unwrap_or_else(|| default_content_type(&input.key)), input.user_metadata),
    };

    let last_modified = Utc::now();
    let record = ObjectRecord {
        key: input.key.clone(),
        bucket: input.bucket.clone(),
        size: write.size,
        last_modified,
        etag: format!("\"{}\"", write.md5_hex),
        content_type,
        user_metadata,
        checksums: checksums.clone(),
    };
    engine.storage().store_object_metadata(&record).await?;

    Ok(CopyObjectOutput { etag: record.etag, last_modified, checksums })
}

/// `GET`/`HEAD /<bucket>/<key>`.
pub async fn get_object(engine: &Engine, input: GetObjectInput) -> Result<GetObjectOutput, ApiError> {
    let record = engine.storage().get_object_metadata(&input.bucket, &input.key).await?;

    let (body, range) = match input.range {
        Some(r) => {
            if r.start > r.end || r.end >= record.size {
                return Err(ApiError::InvalidRange);
            }
            let data = engine.storage().get_object_data_range(&input.bucket, &input.key, r.start, r.end).await?;
            (data, Some((r.start, r.end)))
        }
        None => {
            let data = engine.storage().get_object_data(&input.bucket, &input.key).await?;
            (data, None)
        }
    };

    let checksums = if input.checksum_mode_enabled { record.checksums } else { ChecksumMap::new() };

    Ok(GetObjectOutput {
        body,
        total_size: record.size,
        etag: record.etag,
        last_modified: record.last_modified,
        content_type: record.content_type,
        user_metadata: record.user_metadata,
        checksums,
        range,
    })
}

/// `DELETE /<bucket>/<key>`. Always idempotent: missing keys are not an error.
pub async fn delete_object(engine: &Engine, input: DeleteObjectInput) -> Result<(), ApiError> {
    let _ = engine.storage().delete_object_data(&input.bucket, &input.key).await;
    let _ = engine.storage().delete_object_metadata(&input.bucket, &input.key).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use cargohold_core::GatewayConfig;
    use cargohold_model::input::bucket::CreateBucketInput;
    use cargohold_model::input::object::ByteRange;
    use cargohold_model::types::ChecksumAlgorithm;

    use super::*;
    use crate::ops::bucket::create_bucket;
    use crate::storage::memory::MemoryBackend;

    fn test_engine() -> Engine {
        Engine::new(Arc::new(MemoryBackend::new()), GatewayConfig::default())
    }

    async fn make_bucket(engine: &Engine, name: &str) {
        create_bucket(engine, CreateBucketInput { bucket: name.to_owned(), bucket_type: None, storage_class: None }).await.unwrap();
    }

    #[tokio::test]
    async fn test_should_put_then_get_object_with_matching_etag() {
        let engine = test_engine();
        make_bucket(&engine, "b").await;

        let put = put_object(
            &engine,
            PutObjectInput {
                bucket: "b".to_owned(),
                key: "hello.txt".to_owned(),
                body: Bytes::from_static(b"Hello World"),
                content_type: Some("text/plain".to_owned()),
                user_metadata: BTreeMap::new(),
                checksum_algorithm: None,
                checksum_value: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(put.etag, "\"b10a8db164e0754105b7a99be72e3fe5\"");

        let got = get_object(&engine, GetObjectInput { bucket: "b".to_owned(), key: "hello.txt".to_owned(), range: None, checksum_mode_enabled: false })
            .await
            .unwrap();
        assert_eq!(got.body.as_ref(), b"Hello World");
        assert_eq!(got.etag, put.etag);
        assert_eq!(got.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_should_guess_content_type_from_key_extension_when_omitted() {
        let engine = test_engine();
        make_bucket(&engine, "b").await;

        put_object(
            &engine,
            PutObjectInput {
                bucket: "b".to_owned(),
                key: "report.json".to_owned(),
                body: Bytes::from_static(b"{}"),
                content_type: None,
                user_metadata: BTreeMap::new(),
                checksum_algorithm: None,
                checksum_value: None,
            },
        )
        .await
        .unwrap();

        let got = get_object(&engine, GetObjectInput { bucket: "b".to_owned(), key: "report.json".to_owned(), range: None, checksum_mode_enabled: false })
            .await
            .unwrap();
        assert_eq!(got.content_type, "application/json");
    }

    #[tokio::test]
    async fn test_should_fall_back_to_octet_stream_for_unknown_extension() {
        let engine = test_engine();
        make_bucket(&engine, "b").await;

        put_object(
            &engine,
            PutObjectInput {
                bucket: "b".to_owned(),
                key: "blob.unknownext".to_owned(),
                body: Bytes::from_static(b"data"),
                content_type: None,
                user_metadata: BTreeMap::new(),
                checksum_algorithm: None,
                checksum_value: None,
            },
        )
        .await
        .unwrap();

        let got = get_object(&engine, GetObjectInput { bucket: "b".to_owned(), key: "blob.unknownext".to_owned(), range: None, checksum_mode_enabled: false })
            .await
            .unwrap();
        assert_eq!(got.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_should_validate_checksum_and_reject_mismatch() {
        let engine = test_engine();
        make_bucket(&engine, "b").await;

        let err = put_object(
            &engine,
            PutObjectInput {
                bucket: "b".to_owned(),
                key: "k".to_owned(),
                body: Bytes::from_static(b"Hello World"),
                content_type: None,
                user_metadata: BTreeMap::new(),
                checksum_algorithm: Some(ChecksumAlgorithm::Crc32),
                checksum_value: Some("wrong==".to_owned()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidChecksum));

        let ok = put_object(
            &engine,
            PutObjectInput {
                bucket: "b".to_owned(),
                key: "k".to_owned(),
                body: Bytes::from_static(b"Hello World"),
                content_type: None,
                user_metadata: BTreeMap::new(),
                checksum_algorithm: Some(ChecksumAlgorithm::Crc32),
                checksum_value: Some("ShexVg==".to_owned()),
            },
        )
        .await
        .unwrap();
        assert_eq!(ok.checksums.get(&ChecksumAlgorithm::Crc32).map(String::as_str), Some("ShexVg=="));
    }

    #[tokio::test]
    async fn test_should_return_requested_range() {
        let engine = test_engine();
        make_bucket(&engine, "b").await;
        put_object(
            &engine,
            PutObjectInput {
                bucket: "b".to_owned(),
                key: "k".to_owned(),
                body: Bytes::from_static(b"0123456789ABCDE"),
                content_type: None,
                user_metadata: BTreeMap::new(),
                checksum_algorithm: None,
                checksum_value: None,
            },
        )
        .await
        .unwrap();

        let got = get_object(
            &engine,
            GetObjectInput { bucket: "b".to_owned(), key: "k".to_owned(), range: Some(ByteRange { start: 5, end: 14 }), checksum_mode_enabled: false },
        )
        .await
        .unwrap();
        assert_eq!(got.body.as_ref(), b"56789ABCDE");
        assert_eq!(got.total_size, 15);
    }

    #[tokio::test]
    async fn test_should_reject_range_beyond_object_size() {
        let engine = test_engine();
        make_bucket(&engine, "b").await;
        put_object(
            &engine,
            PutObjectInput {
                bucket: "b".to_owned(),
                key: "k".to_owned(),
                body: Bytes::from_static(b"short"),
                content_type: None,
                user_metadata: BTreeMap::new(),
                checksum_algorithm: None,
                checksum_value: None,
            },
        )
        .await
        .unwrap();

        let err = get_object(
            &engine,
            GetObjectInput { bucket: "b".to_owned(), key: "k".to_owned(), range: Some(ByteRange { start: 0, end: 100 }), checksum_mode_enabled: false },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRange));
    }

    #[tokio::test]
    async fn test_should_copy_object_preserving_metadata_by_default() {
        let engine = test_engine();
        make_bucket(&engine, "b").await;
        let mut meta = BTreeMap::new();
        meta.insert("x-amz-meta-owner".to_owned(), "alice".to_owned());
        put_object(
            &engine,
            PutObjectInput {
                bucket: "b".to_owned(),
                key: "src".to_owned(),
                body: Bytes::from_static(b"payload"),
                content_type: Some("text/plain".to_owned()),
                user_metadata: meta.clone(),
                checksum_algorithm: None,
                checksum_value: None,
            },
        )
        .await
        .unwrap();

        let copied = copy_object(
            &engine,
            CopyObjectInput {
                bucket: "b".to_owned(),
                key: "dst".to_owned(),
                source_bucket: "b".to_owned(),
                source_key: "src".to_owned(),
                metadata_directive: MetadataDirective::Copy,
                content_type: None,
                user_metadata: BTreeMap::new(),
            },
        )
        .await
        .unwrap();

        let got = get_object(&engine, GetObjectInput { bucket: "b".to_owned(), key: "dst".to_owned(), range: None, checksum_mode_enabled: false })
            .await
            .unwrap();
        assert_eq!(got.content_type, "text/plain");
        assert_eq!(got.user_metadata, meta);
        assert_eq!(copied.etag, "\"321c3cf486ed509164edec1e1981fec8\"");
    }

    #[tokio::test]
    async fn test_delete_object_is_idempotent() {
        let engine = test_engine();
        make_bucket(&engine, "b").await;
        delete_object(&engine, DeleteObjectInput { bucket: "b".to_owned(), key: "never-existed".to_owned() }).await.unwrap();
    }
}
