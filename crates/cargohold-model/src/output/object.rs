//! Response outputs for single-object operations.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::types::ChecksumMap;

/// `PutObject` response.
#[derive(Debug, Clone)]
pub struct PutObjectOutput {
    /// ETag of the stored object (quoted).
    pub etag: String,
    /// Checksums computed during the put, if any were requested.
    pub checksums: ChecksumMap,
}

/// `CopyObject` response.
#[derive(Debug, Clone)]
pub struct CopyObjectOutput {
    /// ETag of the destination object (quoted).
    pub etag: String,
    /// Last modification time of the destination object.
    pub last_modified: DateTime<Utc>,
    /// Checksums copied or recomputed for the destination.
    pub checksums: ChecksumMap,
}

/// `GetObject`/`HeadObject` response.
#[derive(Debug, Clone)]
pub struct GetObjectOutput {
    /// Object bytes (full object or the requested range). Empty for `HeadObject`.
    pub body: Bytes,
    /// Total object size (not the range length).
    pub total_size: u64,
    /// ETag (quoted).
    pub etag: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// Content type.
    pub content_type: String,
    /// User metadata.
    pub user_metadata: BTreeMap<String, String>,
    /// Stored checksums, included only when the caller asked for them.
    pub checksums: ChecksumMap,
    /// The byte range actually returned, if the request used `Range`.
    pub range: Option<(u64, u64)>,
}
