//! In-memory [`Backend`] implementation.
//!
//! Object/part bytes live in [`DashMap`]s keyed by composite tuples. This
//! backend also tracks bucket and upload metadata directly, treating
//! metadata as a backend responsibility rather than the caller's.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use cargohold_model::types::{BucketRecord, ChecksumAlgorithm, MultipartUploadRecord, ObjectRecord, PartRecord};
use chrono::Utc;
use dashmap::DashMap;
use futures::StreamExt;
use uuid::Uuid;

use super::{Backend, ByteStream, StorageError, StoredWrite};
use crate::checksums::StreamingHasher;

type ObjectKey = (String, String);
type PartKey = (String, u32);

/// In-memory storage backend. Every map is a [`DashMap`] for lock-free
/// concurrent access; no data survives process restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    bucket_data: DashMap<String, ()>,
    bucket_metadata: DashMap<String, BucketRecord>,
    object_data: DashMap<ObjectKey, Bytes>,
    object_metadata: DashMap<ObjectKey, ObjectRecord>,
    part_data: DashMap<PartKey, Bytes>,
    uploads: DashMap<String, MultipartUploadRecord>,
    upload_seq: AtomicU32,
}

impl MemoryBackend {
    /// Build an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_upload_id(&self) -> String {
        let seq = self.upload_seq.fetch_add(1, Ordering::Relaxed);
        format!("{}-{seq:08x}", Uuid::new_v4().simple())
    }
}

async fn collect_stream(mut stream: ByteStream) -> Result<Bytes, StorageError> {
    let mut buf = BytesMut::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf.freeze())
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn create_bucket_data(&self, bucket: &str) -> Result<(), StorageError> {
        self.bucket_data.insert(bucket.to_owned(), ());
        Ok(())
    }

    async fn delete_bucket_data(&self, bucket: &str, force: bool) -> Result<(), StorageError> {
        let has_objects = self.object_metadata.iter().any(|e| e.key().0 == bucket);
        if has_objects && !force {
            return Err(StorageError::BucketNotEmpty);
        }
        self.object_data.retain(|k, _| k.0 != bucket);
        self.object_metadata.retain(|k, _| k.0 != bucket);
        self.bucket_data.remove(bucket);
        Ok(())
    }

    async fn bucket_data_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        Ok(self.bucket_data.contains_key(bucket))
    }

    async fn list_bucket_names(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = self.bucket_data.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn store_bucket_metadata(&self, record: &BucketRecord) -> Result<(), StorageError> {
        self.bucket_metadata.insert(record.name.clone(), record.clone());
        Ok(())
    }

    async fn get_bucket_metadata(&self, bucket: &str) -> Result<BucketRecord, StorageError> {
        self.bucket_metadata.get(bucket).map(|e| e.clone()).ok_or(StorageError::NoSuchBucket)
    }

    async fn get_all_bucket_metadata(&self) -> Result<Vec<BucketRecord>, StorageError> {
        let mut records: Vec<BucketRecord> = self.bucket_metadata.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(records)
    }

    async fn delete_bucket_metadata(&self, bucket: &str) -> Result<(), StorageError> {
        self.bucket_metadata.remove(bucket);
        Ok(())
    }

    async fn update_bucket_tags(&self, bucket: &str, tags: BTreeMap<String, String>) -> Result<(), StorageError> {
        let mut entry = self.bucket_metadata.get_mut(bucket).ok_or(StorageError::NoSuchBucket)?;
        entry.tags = tags;
        Ok(())
    }

    async fn store_object_data(
        &self,
        bucket: &str,
        key: &str,
        data: ByteStream,
        checksum_algorithms: &[ChecksumAlgorithm],
    ) -> Result<StoredWrite, StorageError> {
        let bytes = collect_stream(data).await?;
        let mut hasher = StreamingHasher::new(checksum_algorithms);
        hasher.update(&bytes);
        let result = hasher.finish();
        let size = bytes.len() as u64;

        self.object_data.insert((bucket.to_owned(), key.to_owned()), bytes);

        Ok(StoredWrite { size, md5_hex: result.md5_hex, checksums: result.checksums })
    }

    async fn get_object_data(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        self.object_data.get(&(bucket.to_owned(), key.to_owned())).map(|e| e.clone()).ok_or(StorageError::NoSuchKey)
    }

    async fn get_object_data_range(&self, bucket: &str, key: &str, start: u64, end: u64) -> Result<Bytes, StorageError> {
        let data = self.get_object_data(bucket, key).await?;
        let len = data.len() as u64;
        if start > end || end >= len {
            return Err(StorageError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, "range out of bounds")));
        }
        Ok(data.slice(start as usize..=end as usize))
    }

    async fn delete_object_data(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.object_data.remove(&(bucket.to_owned(), key.to_owned()));
        Ok(())
    }

    async fn object_data_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self.object_data.contains_key(&(bucket.to_owned(), key.to_owned())))
    }

    async fn object_data_size(&self, bucket: &str, key: &str) -> Result<u64, StorageError> {
        self.object_data.get(&(bucket.to_owned(), key.to_owned())).map(|e| e.len() as u64).ok_or(StorageError::NoSuchKey)
    }

    async fn store_object_metadata(&self, record: &ObjectRecord) -> Result<(), StorageError> {
        self.object_metadata.insert((record.bucket.clone(), record.key.clone()), record.clone());
        Ok(())
    }

    async fn get_object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectRecord, StorageError> {
        self.object_metadata.get(&(bucket.to_owned(), key.to_owned())).map(|e| e.clone()).ok_or(StorageError::NoSuchKey)
    }

    async fn delete_object_metadata(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        self.object_metadata.remove(&(bucket.to_owned(), key.to_owned()));
        Ok(())
    }

    async fn list_object_metadata(&self, bucket: &str) -> Result<Vec<ObjectRecord>, StorageError> {
        let mut records: Vec<ObjectRecord> =
            self.object_metadata.iter().filter(|e| e.key().0 == bucket).map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(records)
    }

    async fn object_metadata_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(self.object_metadata.contains_key(&(bucket.to_owned(), key.to_owned())))
    }

    async fn store_part(
        &self,
        upload_id: &str,
        part_number: u32,
        data: ByteStream,
        checksum_algorithm: Option<ChecksumAlgorithm>,
    ) -> Result<StoredWrite, StorageError> {
        let bytes = collect_stream(data).await?;
        let algos: Vec<ChecksumAlgorithm> = checksum_algorithm.into_iter().collect();
        let mut hasher = StreamingHasher::new(&algos);
        hasher.update(&bytes);
        let result = hasher.finish();
        let size = bytes.len() as u64;

        self.part_data.insert((upload_id.to_owned(), part_number), bytes);

        Ok(StoredWrite { size, md5_hex: result.md5_hex, checksums: result.checksums })
    }

    async fn get_part(&self, upload_id: &str, part_number: u32) -> Result<Bytes, StorageError> {
        self.part_data.get(&(upload_id.to_owned(), part_number)).map(|e| e.clone()).ok_or(StorageError::NoSuchPart)
    }

    async fn delete_part(&self, upload_id: &str, part_number: u32) -> Result<(), StorageError> {
        self.part_data.remove(&(upload_id.to_owned(), part_number));
        Ok(())
    }

    async fn delete_all_parts(&self, upload_id: &str) -> Result<(), StorageError> {
        self.part_data.retain(|k, _| k.0 != upload_id);
        Ok(())
    }

    async fn list_stored_parts(&self, upload_id: &str) -> Result<Vec<u32>, StorageError> {
        let mut numbers: Vec<u32> = self.part_data.iter().filter(|e| e.key().0 == upload_id).map(|e| e.key().1).collect();
        numbers.sort_unstable();
        Ok(numbers)
    }

    async fn initiate_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: String,
        user_metadata: BTreeMap<String, String>,
        checksum_algorithm: Option<ChecksumAlgorithm>,
    ) -> Result<MultipartUploadRecord, StorageError> {
        let upload_id = self.next_upload_id();
        let record = MultipartUploadRecord {
            upload_id: upload_id.clone(),
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            initiated: Utc::now(),
            content_type,
            user_metadata,
            checksum_algorithm,
            parts: BTreeMap::new(),
        };
        self.uploads.insert(upload_id, record.clone());
        Ok(record)
    }

    async fn get_upload(&self, upload_id: &str) -> Result<MultipartUploadRecord, StorageError> {
        self.uploads.get(upload_id).map(|e| e.clone()).ok_or(StorageError::NoSuchUpload)
    }

    async fn update_upload_parts(&self, upload_id: &str, parts: BTreeMap<u32, PartRecord>) -> Result<(), StorageError> {
        let mut entry = self.uploads.get_mut(upload_id).ok_or(StorageError::NoSuchUpload)?;
        entry.parts = parts;
        Ok(())
    }

    async fn delete_upload(&self, upload_id: &str) -> Result<(), StorageError> {
        self.uploads.remove(upload_id);
        Ok(())
    }

    async fn list_uploads(&self, bucket: &str) -> Result<Vec<MultipartUploadRecord>, StorageError> {
        let mut uploads: Vec<MultipartUploadRecord> =
            self.uploads.iter().filter(|e| e.value().bucket == bucket).map(|e| e.value().clone()).collect();
        uploads.sort_by_key(|u| u.initiated);
        Ok(uploads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn body(data: &'static [u8]) -> ByteStream {
        Box::pin(stream::once(async move { Ok(Bytes::from_static(data)) }))
    }

    #[tokio::test]
    async fn test_should_round_trip_object_data() {
        let backend = MemoryBackend::new();
        let write = backend.store_object_data("b", "k", body(b"hello"), &[]).await.unwrap();
        assert_eq!(write.size, 5);
        let data = backend.get_object_data("b", "k").await.unwrap();
        assert_eq!(&data[..], b"hello");
    }

    #[tokio::test]
    async fn test_should_fail_missing_object() {
        let backend = MemoryBackend::new();
        assert!(matches!(backend.get_object_data("b", "missing").await, Err(StorageError::NoSuchKey)));
    }

    #[tokio::test]
    async fn test_should_slice_object_range() {
        let backend = MemoryBackend::new();
        backend.store_object_data("b", "k", body(b"0123456789"), &[]).await.unwrap();
        let slice = backend.get_object_data_range("b", "k", 2, 4).await.unwrap();
        assert_eq!(&slice[..], b"234");
    }

    #[tokio::test]
    async fn test_should_reject_bucket_deletion_when_not_empty() {
        let backend = MemoryBackend::new();
        backend.create_bucket_data("b").await.unwrap();
        backend
            .store_object_metadata(&ObjectRecord {
                key: "k".into(),
                bucket: "b".into(),
                size: 1,
                last_modified: Utc::now(),
                etag: "e".into(),
                content_type: "text/plain".into(),
                user_metadata: BTreeMap::new(),
                checksums: Default::default(),
            })
            .await
            .unwrap();
        assert!(matches!(backend.delete_bucket_data("b", false).await, Err(StorageError::BucketNotEmpty)));
        assert!(backend.delete_bucket_data("b", true).await.is_ok());
    }

    #[tokio::test]
    async fn test_should_track_parts_and_assign_unique_upload_ids() {
        let backend = MemoryBackend::new();
        let u1 = backend.initiate_upload("b", "k", "text/plain".into(), BTreeMap::new(), None).await.unwrap();
        let u2 = backend.initiate_upload("b", "k", "text/plain".into(), BTreeMap::new(), None).await.unwrap();
        assert_ne!(u1.upload_id, u2.upload_id);

        backend.store_part(&u1.upload_id, 1, body(b"part-one"), None).await.unwrap();
        let stored = backend.list_stored_parts(&u1.upload_id).await.unwrap();
        assert_eq!(stored, vec![1]);

        backend.delete_all_parts(&u1.upload_id).await.unwrap();
        assert!(backend.list_stored_parts(&u1.upload_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_should_list_buckets_sorted() {
        let backend = MemoryBackend::new();
        backend.create_bucket_data("zebra").await.unwrap();
        backend.create_bucket_data("apple").await.unwrap();
        assert_eq!(backend.list_bucket_names().await.unwrap(), vec!["apple", "zebra"]);
    }
}
