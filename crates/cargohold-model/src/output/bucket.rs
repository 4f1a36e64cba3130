//! Response outputs for bucket-level operations.

use chrono::{DateTime, Utc};

use crate::types::{BucketType, Owner};

/// One entry in a `ListBuckets` response.
#[derive(Debug, Clone)]
pub struct BucketSummary {
    /// Bucket name.
    pub name: String,
    /// Creation time.
    pub creation_date: DateTime<Utc>,
}

/// `ListBuckets` response.
#[derive(Debug, Clone)]
pub struct ListBucketsOutput {
    /// Buckets visible to the caller.
    pub buckets: Vec<BucketSummary>,
    /// The account owner (fixed; ACLs are out of scope).
    pub owner: Owner,
}

/// `CreateBucket`/`HeadBucket` response.
#[derive(Debug, Clone)]
pub struct BucketInfoOutput {
    /// Bucket variant.
    pub bucket_type: BucketType,
    /// Storage class.
    pub storage_class: String,
}
