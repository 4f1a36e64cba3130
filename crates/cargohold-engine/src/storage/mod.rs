//! The storage backend abstraction.
//!
//! `cargohold-engine`'s operation handlers are generic over [`Backend`] so
//! the same multipart/object/bucket logic runs unmodified against either
//! [`memory::MemoryBackend`] or [`filesystem::FilesystemBackend`].

pub mod filesystem;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use cargohold_model::types::{BucketRecord, ChecksumMap, MultipartUploadRecord, ObjectRecord, PartRecord};
use futures::stream::BoxStream;

use crate::checksums::HasherResult;

/// A lazy, backpressure-friendly sequence of body chunks read from or
/// written to a backend.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Result of writing a whole object's or a part's data: the computed ETag
/// material plus any checksums the caller asked the write to track.
#[derive(Debug, Clone)]
pub struct StoredWrite {
    /// Size in bytes actually written.
    pub size: u64,
    /// Hex MD5 digest of the written bytes.
    pub md5_hex: String,
    /// Any checksums requested for this write.
    pub checksums: Vec<(cargohold_model::types::ChecksumAlgorithm, String)>,
}

impl From<HasherResult> for StoredWrite {
    fn from(result: HasherResult) -> Self {
        Self { size: 0, md5_hex: result.md5_hex, checksums: result.checksums }
    }
}

/// Backend-level storage errors. Operation handlers convert these into
/// `cargohold_model::error::ApiError` with the request's own context.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested bucket does not exist.
    #[error("bucket not found")]
    NoSuchBucket,
    /// The requested object key does not exist.
    #[error("key not found")]
    NoSuchKey,
    /// The requested multipart upload does not exist.
    #[error("upload not found")]
    NoSuchUpload,
    /// The requested part does not exist.
    #[error("part not found")]
    NoSuchPart,
    /// `CreateBucket` was called for a name that already exists.
    #[error("bucket already exists")]
    BucketAlreadyExists,
    /// `DeleteBucket` was called on a non-empty bucket without `force`.
    #[error("bucket not empty")]
    BucketNotEmpty,
    /// The underlying filesystem or serialization layer failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A lock could not be acquired in time.
    #[error("lock acquisition timed out")]
    LockTimeout,
}

impl From<StorageError> for cargohold_model::error::ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NoSuchBucket => Self::NoSuchBucket,
            StorageError::NoSuchKey => Self::NoSuchKey,
            StorageError::NoSuchUpload => Self::NoSuchUpload,
            StorageError::NoSuchPart => Self::InvalidPart,
            StorageError::BucketAlreadyExists => Self::BucketAlreadyOwnedByYou,
            StorageError::BucketNotEmpty => Self::BucketNotEmpty,
            StorageError::Io(_) | StorageError::LockTimeout => Self::Internal,
        }
    }
}

/// The storage interface the engine's operation handlers run against
///. Every method is async; implementations are expected to
/// acquire the relevant path lock internally.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    // -- Bucket data -----------------------------------------------------

    /// Create the bucket's data directory/namespace.
    async fn create_bucket_data(&self, bucket: &str) -> Result<(), StorageError>;
    /// Delete the bucket's data, failing if non-empty unless `force`.
    async fn delete_bucket_data(&self, bucket: &str, force: bool) -> Result<(), StorageError>;
    /// Whether the bucket's data namespace exists.
    async fn bucket_data_exists(&self, bucket: &str) -> Result<bool, StorageError>;
    /// All known bucket names.
    async fn list_bucket_names(&self) -> Result<Vec<String>, StorageError>;

    // -- Bucket metadata ---------------------------------------------------

    /// Persist a bucket metadata record, creating or overwriting it.
    async fn store_bucket_metadata(&self, record: &BucketRecord) -> Result<(), StorageError>;
    /// Fetch a single bucket's metadata.
    async fn get_bucket_metadata(&self, bucket: &str) -> Result<BucketRecord, StorageError>;
    /// Fetch every known bucket's metadata.
    async fn get_all_bucket_metadata(&self) -> Result<Vec<BucketRecord>, StorageError>;
    /// Delete a bucket's metadata record.
    async fn delete_bucket_metadata(&self, bucket: &str) -> Result<(), StorageError>;
    /// Replace a bucket's tag mapping.
    async fn update_bucket_tags(&self, bucket: &str, tags: std::collections::BTreeMap<String, String>) -> Result<(), StorageError>;

    // -- Object data -------------------------------------------------------

    /// Store an object's bytes from a lazy stream, returning the computed write result.
    async fn store_object_data(
        &self,
        bucket: &str,
        key: &str,
        data: ByteStream,
        checksum_algorithms: &[cargohold_model::types::ChecksumAlgorithm],
    ) -> Result<StoredWrite, StorageError>;
    /// Read an object's full bytes.
    async fn get_object_data(&self, bucket: &str, key: &str) -> Result<Bytes, StorageError>;
    /// Read a byte range `[start, end]` inclusive of an object's data.
    async fn get_object_data_range(&self, bucket: &str, key: &str, start: u64, end: u64) -> Result<Bytes, StorageError>;
    /// Delete an object's data.
    async fn delete_object_data(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
    /// Whether an object's data exists.
    async fn object_data_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;
    /// Size in bytes of an object's stored data.
    async fn object_data_size(&self, bucket: &str, key: &str) -> Result<u64, StorageError>;

    // -- Object metadata -----------------------------------------------------

    /// Persist an object metadata record.
    async fn store_object_metadata(&self, record: &ObjectRecord) -> Result<(), StorageError>;
    /// Fetch an object's metadata.
    async fn get_object_metadata(&self, bucket: &str, key: &str) -> Result<ObjectRecord, StorageError>;
    /// Delete an object's metadata.
    async fn delete_object_metadata(&self, bucket: &str, key: &str) -> Result<(), StorageError>;
    /// List every object metadata record in a bucket, key-ordered.
    async fn list_object_metadata(&self, bucket: &str) -> Result<Vec<ObjectRecord>, StorageError>;
    /// Whether an object's metadata record exists.
    async fn object_metadata_exists(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    // -- Part data -----------------------------------------------------------

    /// Store one part's bytes from a lazy stream.
    async fn store_part(
        &self,
        upload_id: &str,
        part_number: u32,
        data: ByteStream,
        checksum_algorithm: Option<cargohold_model::types::ChecksumAlgorithm>,
    ) -> Result<StoredWrite, StorageError>;
    /// Read a part's full bytes.
    async fn get_part(&self, upload_id: &str, part_number: u32) -> Result<Bytes, StorageError>;
    /// Delete a single part's data.
    async fn delete_part(&self, upload_id: &str, part_number: u32) -> Result<(), StorageError>;
    /// Delete all parts for an upload.
    async fn delete_all_parts(&self, upload_id: &str) -> Result<(), StorageError>;
    /// Enumerate the part numbers actually stored on disk for an upload.
    async fn list_stored_parts(&self, upload_id: &str) -> Result<Vec<u32>, StorageError>;

    // -- Upload metadata -------------------------------------------------------

    /// Create a new multipart upload record, assigning its UploadId.
    async fn initiate_upload(
        &self,
        bucket: &str,
        key: &str,
        content_type: String,
        user_metadata: std::collections::BTreeMap<String, String>,
        checksum_algorithm: Option<cargohold_model::types::ChecksumAlgorithm>,
    ) -> Result<MultipartUploadRecord, StorageError>;
    /// Fetch an upload's current record.
    async fn get_upload(&self, upload_id: &str) -> Result<MultipartUploadRecord, StorageError>;
    /// Replace an upload's stored part list (used after `UploadPart` completes).
    async fn update_upload_parts(&self, upload_id: &str, parts: std::collections::BTreeMap<u32, PartRecord>) -> Result<(), StorageError>;
    /// Delete an upload's metadata record.
    async fn delete_upload(&self, upload_id: &str) -> Result<(), StorageError>;
    /// List active uploads for a bucket, ordered by initiation time ascending.
    async fn list_uploads(&self, bucket: &str) -> Result<Vec<MultipartUploadRecord>, StorageError>;
}

/// Computed part/object checksums as stored on a metadata record.
#[must_use]
pub fn checksums_from_pairs(pairs: Vec<(cargohold_model::types::ChecksumAlgorithm, String)>) -> ChecksumMap {
    pairs.into_iter().collect()
}
