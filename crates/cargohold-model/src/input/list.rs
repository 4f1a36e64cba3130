//! Request input for `ListObjects`/`ListObjectsV2`.

/// Which listing API version the client called, since V1 uses `marker` and
/// V2 uses `continuation-token` for the same pagination cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListVersion {
    /// `GET /<bucket>` with no `list-type` query parameter.
    V1,
    /// `GET /<bucket>?list-type=2`.
    V2,
}

/// `GET /<bucket>` (listing) request input.
#[derive(Debug, Clone)]
pub struct ListObjectsInput {
    /// Target bucket name.
    pub bucket: String,
    /// Which API version was requested.
    pub version: ListVersion,
    /// Key prefix filter.
    pub prefix: String,
    /// Optional delimiter for common-prefix rollup.
    pub delimiter: Option<String>,
    /// The exclusive-lower-bound pagination cursor (`marker` or
    /// `continuation-token`, whichever the client sent).
    pub cursor: Option<String>,
    /// Maximum number of entries to return.
    pub max_keys: u32,
}

impl ListObjectsInput {
    /// S3's default `max-keys` when the client doesn't specify one.
    pub const DEFAULT_MAX_KEYS: u32 = 1000;
}

/// `GET /<bucket>?uploads` request input.
#[derive(Debug, Clone)]
pub struct ListMultipartUploadsInput {
    /// Target bucket name.
    pub bucket: String,
}
