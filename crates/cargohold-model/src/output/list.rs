//! Response output for `ListObjects`/`ListObjectsV2`.

use chrono::{DateTime, Utc};

use crate::types::{ChecksumMap, Owner};

/// One object entry in a listing response.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    /// Object key.
    pub key: String,
    /// Last modification time.
    pub last_modified: DateTime<Utc>,
    /// ETag (already quoted).
    pub etag: String,
    /// Size in bytes.
    pub size: u64,
    /// Owner (fixed; ACLs are out of scope).
    pub owner: Owner,
}

/// Full `ListObjects`/`ListObjectsV2` response.
#[derive(Debug, Clone)]
pub struct ListObjectsOutput {
    /// Bucket name.
    pub name: String,
    /// Prefix filter echoed back.
    pub prefix: String,
    /// Delimiter echoed back, if any.
    pub delimiter: Option<String>,
    /// `max-keys` echoed back.
    pub max_keys: u32,
    /// Matching objects.
    pub contents: Vec<ObjectSummary>,
    /// Rolled-up common prefixes.
    pub common_prefixes: Vec<String>,
    /// Whether more results exist beyond this page.
    pub is_truncated: bool,
    /// The cursor for the next page, present iff `is_truncated`.
    pub next_cursor: Option<String>,
}
