//! Filesystem [`Backend`] implementation.
//!
//! Every write goes through a write-temp-then-rename, same as the other
//! atomic mutations in this crate. Path layout:
//!
//! ```text
//! <dataRoot>/<bucket>/<key>
//! <metaRoot>/<bucket>/<key>.json
//! <metaRoot>/_buckets/<bucket>.json
//! <metaRoot>/_multipart_uploads/<uploadId>/upload.metadata.json
//! <metaRoot>/_multipart_uploads/<uploadId>/part_<N>
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use cargohold_model::types::{BucketRecord, ChecksumAlgorithm, MultipartUploadRecord, ObjectRecord, PartRecord};
use futures::StreamExt;
use rand::RngExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::trace;
use uuid::Uuid;

use super::{Backend, ByteStream, StorageError, StoredWrite};
use crate::checksums::StreamingHasher;
use crate::locks::{DEFAULT_TIMEOUT, LockRegistry};

/// Filesystem-backed storage rooted at a data directory and a metadata
/// directory, serialized through the shared [`LockRegistry`].
#[derive(Debug)]
pub struct FilesystemBackend {
    data_root: PathBuf,
    meta_root: PathBuf,
    locks: LockRegistry,
}

impl FilesystemBackend {
    /// Build a backend rooted at `data_root`/`meta_root`, sharing `locks`
    /// with the rest of the engine.
    #[must_use]
    pub fn new(data_root: impl Into<PathBuf>, meta_root: impl Into<PathBuf>, locks: LockRegistry) -> Self {
        Self { data_root: data_root.into(), meta_root: meta_root.into(), locks }
    }

    fn object_data_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.data_root.join(bucket).join(key)
    }

    fn object_metadata_path(&self, bucket: &str, key: &str) -> PathBuf {
        let mut path = self.meta_root.join(bucket).join(key);
        append_extension(&mut path, "json");
        path
    }

    fn bucket_metadata_path(&self, bucket: &str) -> PathBuf {
        self.meta_root.join("_buckets").join(format!("{bucket}.json"))
    }

    fn upload_dir(&self, upload_id: &str) -> PathBuf {
        self.meta_root.join("_multipart_uploads").join(upload_id)
    }

    fn upload_metadata_path(&self, upload_id: &str) -> PathBuf {
        self.upload_dir(upload_id).join("upload.metadata.json")
    }

    fn part_path(&self, upload_id: &str, part_number: u32) -> PathBuf {
        self.upload_dir(upload_id).join(format!("part_{part_number}"))
    }

    async fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), StorageError> {
        let parent = path.parent().ok_or_else(|| std::io::Error::other("path has no parent"))?;
        tokio::fs::create_dir_all(parent).await?;

        let suffix: u64 = rand::rng().random();
        let tmp_path = parent.join(format!("{}.tmp.{suffix:x}", path.file_name().and_then(|n| n.to_str()).unwrap_or("tmp")));

        {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(data).await?;
            file.sync_all().await?;
        }
        tokio::fs::rename(&tmp_path, path).await?;
        trace!(path = %path.display(), "wrote file atomically");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes, StorageError> {
        let mut file = tokio::fs::File::open(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound { StorageError::NoSuchKey } else { StorageError::Io(e) }
        })?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).await?;
        Ok(Bytes::from(buf))
    }

    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(value).map_err(|e| StorageError::Io(std::io::Error::other(e)))?;
        self.write_atomic(path, &json).await
    }

    async fn read_json<T: serde::de::DeserializeOwned>(&self, path: &Path) -> Result<T, StorageError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound { StorageError::NoSuchKey } else { StorageError::Io(e) }
        })?;
        serde_json::from_slice(&bytes).map_err(|e| StorageError::Io(std::io::Error::other(e)))
    }

    async fn write_stream_atomic(
        &self,
        path: &Path,
        mut data: ByteStream,
        algorithms: &[ChecksumAlgorithm],
    ) -> Result<StoredWrite, StorageError> {
        let parent = path.parent().ok_or_else(|| std::io::Error::other("path has no parent"))?;
        tokio::fs::create_dir_all(parent).await?;

        let suffix: u64 = rand::rng().random();
        let tmp_path = parent.join(format!("{}.tmp.{suffix:x}", path.file_name().and_then(|n| n.to_str()).unwrap_or("tmp")));

        let mut hasher = StreamingHasher::new(algorithms);
        let mut size: u64 = 0;
        {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            while let Some(chunk) = data.next().await {
                let chunk = chunk?;
                hasher.update(&chunk);
                size += chunk.len() as u64;
                file.write_all(&chunk).await?;
            }
            file.sync_all().await?;
        }
        tokio::fs::rename(&tmp_path, path).await?;

        let result = hasher.finish();
        Ok(StoredWrite { size, md5_hex: result.md5_hex, checksums: result.checksums })
    }
}

fn append_extension(path: &mut PathBuf, ext: &str) {
    match path.extension() {
        Some(existing) => {
            let mut combined = existing.to_os_string();
            combined.push(".");
            combined.push(ext);
            path.set_extension(combined);
        }
        None => {
            path.set_extension(ext);
        }
    }
}

#[async_trait]
impl Backend for FilesystemBackend {
    async fn create_bucket_data(&self, bucket: &str) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(self.data_root.join(bucket)).await?;
        Ok(())
    }

    async fn delete_bucket_data(&self, bucket: &str, force: bool) -> Result<(), StorageError> {
        let dir = self.data_root.join(bucket);
        if !force {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(e) => e,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(e.into()),
            };
            if entries.next_entry().await?.is_some() {
                return Err(StorageError::BucketNotEmpty);
            }
        }
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(_e) if !dir.exists() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn bucket_data_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        Ok(tokio::fs::try_exists(self.data_root.join(bucket)).await?)
    }

    async fn list_bucket_names(&self) -> Result<Vec<String>, StorageError> {
        let buckets_dir = self.meta_root.join("_buckets");
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&buckets_dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str().and_then(|n| n.strip_suffix(".json")) {
                names.push(name.to_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn store_bucket_metadata(&self, record: &BucketRecord) -> Result<(), StorageError> {
        let path = self.bucket_metadata_path(&record.name);
        self.locks.do_write(&path, DEFAULT_TIMEOUT, || self.write_json(&path, record)).await.map_err(|_| StorageError::LockTimeout)?
    }

    async fn get_bucket_metadata(&self, bucket: &str) -> Result<BucketRecord, StorageError> {
        let path = self.bucket_metadata_path(bucket);
        self.read_json(&path).await.map_err(|e| if matches!(e, StorageError::NoSuchKey) { StorageError::NoSuchBucket } else { e })
    }

    async fn get_all_bucket_metadata(&self) -> Result<Vec<BucketRecord>, StorageError> {
        let mut records = Vec::new();
        for name in self.list_bucket_names().await? {
            records.push(self.get_bucket_metadata(&name).await?);
        }
        Ok(records)
    }

    async fn delete_bucket_metadata(&self, bucket: &str) -> Result<(), StorageError> {
        let path = self.bucket_metadata_path(bucket);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(_e) if !path.exists() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_bucket_tags(&self, bucket: &str, tags: BTreeMap<String, String>) -> Result<(), StorageError> {
        let mut record = self.get_bucket_metadata(bucket).await?;
        record.tags = tags;
        self.store_bucket_metadata(&record).await
    }

    async fn store_object_data(
        &self,
        bucket: &str,
        key: &str,
        data: ByteStream,
        checksum_algorithms: &[ChecksumAlgorithm],
    ) -> Result<StoredWrite, StorageError> {
        let path = self.object_data_path(bucket, key);
        self.locks
            .do_write(&path, DEFAULT_TIMEOUT, || self.write_stream_atomic(&path, data, checksum_algorithms))
            .await
            .map_err(|_| StorageError::LockTimeout)?
    }

    async fn get_object_data(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError> {
        let path = self.object_data_path(bucket, key);
        self.locks.do_read(&path, DEFAULT_TIMEOUT, || self.read_file(&path)).await.map_err(|_| StorageError::LockTimeout)?
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
        let path = self.object_data_path(bucket, key);
        self.locks
            .do_write(&path, DEFAULT_TIMEOUT, || async {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => Ok(()),
                    Err(_e) if !path.exists() => Ok(()),
                    Err(e) => Err(StorageError::from(e)),
                }
            })
            .await
            .map_err(|_| StorageError::LockTimeout)?
    }

    async fn object_data_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(tokio::fs::try_exists(self.object_data_path(bucket, key)).await?)
    }

    async fn object_data_size(&self, bucket: &str, key: &str) -> Result<u64, StorageError> {
        let meta = tokio::fs::metadata(self.object_data_path(bucket, key))
            .await
            .map_err(|e| if e.kind() == std::io::ErrorKind::NotFound { StorageError::NoSuchKey } else { StorageError::Io(e) })?;
        Ok(meta.len())
    }

    async fn store_object_metadata(&self, record: &ObjectRecord) -> Result<(), StorageError> {
        let path = self.object_metadata_path(&record.bucket, &record.key);
        self.locks.do_write(&path, DEFAULT_TIMEOUT, || self.write_json(&path, record)).await.map_err(|_| StorageError::LockTimeout)?
    }

    async fn get_object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectRecord, StorageError> {
        let path = self.object_metadata_path(bucket, key);
        self.read_json(&path).await
    }

    async fn delete_object_metadata(&self, bucket: &str, key: &str) -> Result<(), StorageError> {
        let path = self.object_metadata_path(bucket, key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(_e) if !path.exists() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_object_metadata(&self, bucket: &str) -> Result<Vec<ObjectRecord>, StorageError> {
        let mut records = Vec::new();
        let root = self.meta_root.join(bucket);
        walk_json_metadata(&root, &mut records).await?;
        records.sort_by(|a: &ObjectRecord, b: &ObjectRecord| a.key.cmp(&b.key));
        Ok(records)
    }

    async fn object_metadata_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        Ok(tokio::fs::try_exists(self.object_metadata_path(bucket, key)).await?)
    }

    async fn store_part(
        &self,
        upload_id: &str,
        part_number: u32,
        data: ByteStream,
        checksum_algorithm: Option<ChecksumAlgorithm>,
    ) -> Result<StoredWrite, StorageError> {
        let path = self.part_path(upload_id, part_number);
        let algos: Vec<ChecksumAlgorithm> = checksum_algorithm.into_iter().collect();
        self.locks.do_write(&path, DEFAULT_TIMEOUT, || self.write_stream_atomic(&path, data, &algos)).await.map_err(|_| StorageError::LockTimeout)?
    }

    async fn get_part(&self, upload_id: &str, part_number: u32) -> Result<Bytes, StorageError> {
        let path = self.part_path(upload_id, part_number);
        self.read_file(&path).await.map_err(|e| if matches!(e, StorageError::NoSuchKey) { StorageError::NoSuchPart } else { e })
    }

    async fn delete_part(&self, upload_id: &str, part_number: u32) -> Result<(), StorageError> {
        let path = self.part_path(upload_id, part_number);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(_e) if !path.exists() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_all_parts(&self, upload_id: &str) -> Result<(), StorageError> {
        let dir = self.upload_dir(upload_id);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_str().is_some_and(|n| n.starts_with("part_")) {
                tokio::fs::remove_file(entry.path()).await?;
            }
        }
        Ok(())
    }

    async fn list_stored_parts(&self, upload_id: &str) -> Result<Vec<u32>, StorageError> {
        let dir = self.upload_dir(upload_id);
        let mut numbers = Vec::new();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(numbers),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(n) = entry.file_name().to_str().and_then(|n| n.strip_prefix("part_")).and_then(|n| n.parse().ok()) {
                numbers.push(n);
            }
        }
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
        let upload_id = Uuid::new_v4().simple().to_string();
        let record = MultipartUploadRecord {
            upload_id: upload_id.clone(),
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            initiated: chrono::Utc::now(),
            content_type,
            user_metadata,
            checksum_algorithm,
            parts: BTreeMap::new(),
        };
        let path = self.upload_metadata_path(&upload_id);
        self.write_json(&path, &record).await?;
        Ok(record)
    }

    async fn get_upload(&self, upload_id: &str) -> Result<MultipartUploadRecord, StorageError> {
        let path = self.upload_metadata_path(upload_id);
        self.read_json(&path).await.map_err(|e| if matches!(e, StorageError::NoSuchKey) { StorageError::NoSuchUpload } else { e })
    }

    async fn update_upload_parts(&self, upload_id: &str, parts: BTreeMap<u32, PartRecord>) -> Result<(), StorageError> {
        let path = self.upload_metadata_path(upload_id);
        self.locks
            .do_write(&path, crate::locks::METADATA_TIMEOUT, || async {
                let mut record: MultipartUploadRecord = self.read_json(&path).await?;
                record.parts = parts;
                self.write_json(&path, &record).await
            })
            .await
            .map_err(|_| StorageError::LockTimeout)?
    }

    async fn delete_upload(&self, upload_id: &str) -> Result<(), StorageError> {
        let dir = self.upload_dir(upload_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(_e) if !dir.exists() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_uploads(&self, bucket: &str) -> Result<Vec<MultipartUploadRecord>, StorageError> {
        let root = self.meta_root.join("_multipart_uploads");
        let mut uploads = Vec::new();
        let mut entries = match tokio::fs::read_dir(&root).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(uploads),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let Some(upload_id) = entry.file_name().to_str().map(str::to_owned) else { continue };
            if let Ok(record) = self.get_upload(&upload_id).await {
                if record.bucket == bucket {
                    uploads.push(record);
                }
            }
        }
        uploads.sort_by_key(|u| u.initiated);
        Ok(uploads)
    }
}

fn walk_json_metadata<'a>(
    dir: &'a Path,
    out: &'a mut Vec<ObjectRecord>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), StorageError>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                walk_json_metadata(&path, out).await?;
            } else if path.extension().is_some_and(|e| e == "json") {
                let bytes = tokio::fs::read(&path).await?;
                if let Ok(record) = serde_json::from_slice::<ObjectRecord>(&bytes) {
                    out.push(record);
                }
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn body(data: &'static [u8]) -> ByteStream {
        Box::pin(stream::once(async move { Ok(Bytes::from_static(data)) }))
    }

    fn backend() -> (FilesystemBackend, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().join("data"), dir.path().join("meta"), LockRegistry::new());
        (backend, dir)
    }

    #[tokio::test]
    async fn test_should_round_trip_object_data_through_temp_and_rename() {
        let (backend, _dir) = backend();
        let write = backend.store_object_data("b", "k", body(b"hello world"), &[]).await.unwrap();
        assert_eq!(write.size, 11);
        let data = backend.get_object_data("b", "k").await.unwrap();
        assert_eq!(&data[..], b"hello world");
    }

    #[tokio::test]
    async fn test_should_round_trip_bucket_metadata() {
        let (backend, _dir) = backend();
        let record = BucketRecord::new("my-bucket".into(), "us-east-1".into(), cargohold_model::types::BucketType::GeneralPurpose);
        backend.store_bucket_metadata(&record).await.unwrap();
        let loaded = backend.get_bucket_metadata("my-bucket").await.unwrap();
        assert_eq!(loaded.name, "my-bucket");
        assert_eq!(loaded.storage_class, "STANDARD");
    }

    #[tokio::test]
    async fn test_should_report_missing_bucket_metadata() {
        let (backend, _dir) = backend();
        assert!(matches!(backend.get_bucket_metadata("nope").await, Err(StorageError::NoSuchBucket)));
    }

    #[tokio::test]
    async fn test_should_list_nested_object_metadata_in_key_order() {
        let (backend, _dir) = backend();
        for key in ["photos/b.jpg", "photos/a.jpg", "readme.txt"] {
            backend
                .store_object_metadata(&ObjectRecord {
                    key: key.into(),
                    bucket: "b".into(),
                    size: 0,
                    last_modified: chrono::Utc::now(),
                    etag: "e".into(),
                    content_type: "application/octet-stream".into(),
                    user_metadata: BTreeMap::new(),
                    checksums: Default::default(),
                })
                .await
                .unwrap();
        }
        let keys: Vec<String> = backend.list_object_metadata("b").await.unwrap().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["photos/a.jpg", "photos/b.jpg", "readme.txt"]);
    }

    #[tokio::test]
    async fn test_should_track_parts_under_upload_directory() {
        let (backend, _dir) = backend();
        let upload = backend.initiate_upload("b", "k", "text/plain".into(), BTreeMap::new(), None).await.unwrap();
        backend.store_part(&upload.upload_id, 1, body(b"part-bytes"), None).await.unwrap();
        assert_eq!(backend.list_stored_parts(&upload.upload_id).await.unwrap(), vec![1]);
        backend.delete_all_parts(&upload.upload_id).await.unwrap();
        assert!(backend.list_stored_parts(&upload.upload_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_should_reject_deleting_non_empty_bucket_without_force() {
        let (backend, _dir) = backend();
        backend.create_bucket_data("b").await.unwrap();
        backend.store_object_data("b", "k", body(b"x"), &[]).await.unwrap();
        assert!(matches!(backend.delete_bucket_data("b", false).await, Err(StorageError::BucketNotEmpty)));
        assert!(backend.delete_bucket_data("b", true).await.is_ok());
    }
}
