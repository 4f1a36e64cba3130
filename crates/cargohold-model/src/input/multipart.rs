//! Request inputs for the multipart upload engine.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::input::object::ByteRange;
use crate::types::ChecksumAlgorithm;

/// `POST /<bucket>/<key>?uploads` request input.
#[derive(Debug, Clone)]
pub struct InitiateMultipartUploadInput {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// `Content-Type` to apply to the eventual object.
    pub content_type: Option<String>,
    /// `x-amz-meta-*` headers to apply to the eventual object.
    pub user_metadata: BTreeMap<String, String>,
    /// Checksum algorithm declared via `x-amz-checksum-algorithm`.
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
}

/// `PUT /<bucket>/<key>?partNumber&uploadId` (no copy source) request input.
#[derive(Debug, Clone)]
pub struct UploadPartInput {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Upload this part belongs to.
    pub upload_id: String,
    /// Part number, 1..=10000.
    pub part_number: u32,
    /// Decoded part bytes.
    pub body: Bytes,
    /// Checksum algorithm supplied via `x-amz-checksum-<alg>` header name, if any.
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    /// The checksum value to validate, if the client supplied one.
    pub checksum_value: Option<String>,
}

/// `PUT /<bucket>/<key>?partNumber&uploadId` with `x-amz-copy-source`.
#[derive(Debug, Clone)]
pub struct UploadPartCopyInput {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Upload this part belongs to.
    pub upload_id: String,
    /// Part number, 1..=10000.
    pub part_number: u32,
    /// Source bucket.
    pub source_bucket: String,
    /// Source key.
    pub source_key: String,
    /// Requested source byte range, if `x-amz-copy-source-range` was sent.
    pub source_range: Option<ByteRange>,
}

/// A single `<Part>` entry in a `CompleteMultipartUpload` request body.
#[derive(Debug, Clone)]
pub struct CompletedPart {
    /// Part number as given by the client.
    pub part_number: u32,
    /// ETag as given by the client (quotes already stripped).
    pub etag: String,
}

/// `POST /<bucket>/<key>?uploadId` request input.
#[derive(Debug, Clone)]
pub struct CompleteMultipartUploadInput {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Upload to complete.
    pub upload_id: String,
    /// The client's ordered part list.
    pub parts: Vec<CompletedPart>,
}

/// `DELETE /<bucket>/<key>?uploadId` request input.
#[derive(Debug, Clone)]
pub struct AbortMultipartUploadInput {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Upload to abort.
    pub upload_id: String,
}

/// `GET /<bucket>/<key>?uploadId` request input.
#[derive(Debug, Clone)]
pub struct ListPartsInput {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Upload to list parts for.
    pub upload_id: String,
    /// Exclusive-lower-bound part number cursor.
    pub part_number_marker: Option<u32>,
    /// Maximum number of parts to return.
    pub max_parts: u32,
}

impl ListPartsInput {
    /// Default `max-parts` when unspecified.
    pub const DEFAULT_MAX_PARTS: u32 = 1000;
}

/// `HEAD /<bucket>/<key>?uploadId` request input.
#[derive(Debug, Clone)]
pub struct HeadMultipartUploadInput {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Upload to report on.
    pub upload_id: String,
}
