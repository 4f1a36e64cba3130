//! Response outputs for the multipart upload engine.

use chrono::{DateTime, Utc};

use crate::types::ChecksumMap;

/// `InitiateMultipartUpload` response.
#[derive(Debug, Clone)]
pub struct InitiateMultipartUploadOutput {
    /// Bucket echoed back.
    pub bucket: String,
    /// Key echoed back.
    pub key: String,
    /// The freshly allocated upload ID.
    pub upload_id: String,
}

/// `UploadPart` response.
#[derive(Debug, Clone)]
pub struct UploadPartOutput {
    /// The part's ETag (quoted).
    pub etag: String,
    /// Checksum computed for the part, if requested.
    pub checksums: ChecksumMap,
}

/// `UploadPartCopy` response (`CopyPartResult` XML element).
#[derive(Debug, Clone)]
pub struct UploadPartCopyOutput {
    /// The part's ETag (quoted).
    pub etag: String,
    /// The time the part was written.
    pub last_modified: DateTime<Utc>,
}

/// `CompleteMultipartUpload` response.
#[derive(Debug, Clone)]
pub struct CompleteMultipartUploadOutput {
    /// Destination bucket.
    pub bucket: String,
    /// Destination key.
    pub key: String,
    /// The composite ETag, `<hex>-<n>`.
    pub etag: String,
    /// Aggregated checksums, if the upload declared an algorithm.
    pub checksums: ChecksumMap,
}

/// One part entry in a `ListParts` response.
#[derive(Debug, Clone)]
pub struct PartSummary {
    /// Part number.
    pub part_number: u32,
    /// ETag (quoted).
    pub etag: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Per-part checksums, if any were stored.
    pub checksums: ChecksumMap,
}

/// `ListParts` response.
#[derive(Debug, Clone)]
pub struct ListPartsOutput {
    /// Bucket.
    pub bucket: String,
    /// Key.
    pub key: String,
    /// Upload ID.
    pub upload_id: String,
    /// Parts in this page, ordered by part number.
    pub parts: Vec<PartSummary>,
    /// Echoed `max-parts`.
    pub max_parts: u32,
    /// Whether more parts exist beyond this page.
    pub is_truncated: bool,
    /// The cursor for the next page, present iff `is_truncated`.
    pub next_part_number_marker: Option<u32>,
}

/// One entry in a `ListMultipartUploads` response.
#[derive(Debug, Clone)]
pub struct MultipartUploadSummary {
    /// Key the upload targets.
    pub key: String,
    /// Upload ID.
    pub upload_id: String,
    /// Initiation time.
    pub initiated: DateTime<Utc>,
}

/// `ListMultipartUploads` response.
#[derive(Debug, Clone)]
pub struct ListMultipartUploadsOutput {
    /// Bucket.
    pub bucket: String,
    /// Uploads, ordered by initiation time ascending.
    pub uploads: Vec<MultipartUploadSummary>,
}

/// `HeadMultipartUpload` response headers.
#[derive(Debug, Clone)]
pub struct HeadMultipartUploadOutput {
    /// Number of parts uploaded so far.
    pub parts_count: usize,
    /// The highest part number uploaded so far.
    pub last_part_number: Option<u32>,
    /// Total size of all uploaded parts.
    pub total_size: u64,
}
