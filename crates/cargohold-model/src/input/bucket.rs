//! Request inputs for bucket-level operations.

use crate::types::BucketType;

/// `PUT /<bucket>` request input.
#[derive(Debug, Clone)]
pub struct CreateBucketInput {
    /// Target bucket name.
    pub bucket: String,
    /// Bucket variant requested via `x-amz-bucket-type`.
    pub bucket_type: Option<BucketType>,
    /// Storage class requested via `x-amz-storage-class`.
    pub storage_class: Option<String>,
}

/// `DELETE /<bucket>` request input.
#[derive(Debug, Clone)]
pub struct DeleteBucketInput {
    /// Target bucket name.
    pub bucket: String,
}

/// `HEAD /<bucket>` request input.
#[derive(Debug, Clone)]
pub struct HeadBucketInput {
    /// Target bucket name.
    pub bucket: String,
}
