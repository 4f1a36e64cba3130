//! Request inputs for single-object operations.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::types::ChecksumAlgorithm;

/// `PUT /<bucket>/<key>` (no copy source) request input.
#[derive(Debug, Clone)]
pub struct PutObjectInput {
    /// Target bucket name.
    pub bucket: String,
    /// Target object key.
    pub key: String,
    /// Decoded request body.
    pub body: Bytes,
    /// Declared `Content-Type`, if any.
    pub content_type: Option<String>,
    /// `x-amz-meta-*` headers, key-preserving.
    pub user_metadata: BTreeMap<String, String>,
    /// The checksum algorithm the client wants computed, if declared via
    /// `x-amz-checksum-algorithm` or implied by an `x-amz-checksum-<alg>` header.
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    /// A client-supplied checksum value to validate against, if any.
    pub checksum_value: Option<String>,
}

/// How `CopyObject` should treat the destination's metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataDirective {
    /// Preserve the source object's metadata and content type.
    Copy,
    /// Replace metadata/content-type with the values on this request.
    Replace,
}

impl Default for MetadataDirective {
    fn default() -> Self {
        Self::Copy
    }
}

/// `PUT /<bucket>/<key>` with `x-amz-copy-source` request input.
#[derive(Debug, Clone)]
pub struct CopyObjectInput {
    /// Destination bucket.
    pub bucket: String,
    /// Destination key.
    pub key: String,
    /// Source bucket (parsed out of `x-amz-copy-source`).
    pub source_bucket: String,
    /// Source key.
    pub source_key: String,
    /// Metadata handling directive.
    pub metadata_directive: MetadataDirective,
    /// `Content-Type` to apply when the directive is `Replace`.
    pub content_type: Option<String>,
    /// `x-amz-meta-*` headers to apply when the directive is `Replace`.
    pub user_metadata: BTreeMap<String, String>,
}

/// An inclusive byte range requested via the `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset, inclusive.
    pub start: u64,
    /// Last byte offset, inclusive.
    pub end: u64,
}

/// `GET`/`HEAD /<bucket>/<key>` request input.
#[derive(Debug, Clone)]
pub struct GetObjectInput {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
    /// Requested byte range, if any.
    pub range: Option<ByteRange>,
    /// Whether `x-amz-checksum-mode: ENABLED` was requested.
    pub checksum_mode_enabled: bool,
}

/// `DELETE /<bucket>/<key>` request input.
#[derive(Debug, Clone)]
pub struct DeleteObjectInput {
    /// Target bucket.
    pub bucket: String,
    /// Target key.
    pub key: String,
}
