//! The domain error enum and its HTTP/S3 status mapping.
//!
//! Kept as a plain `(code, status)` pair rather than a pre-built response
//! type, so `cargohold-http` controls the XML formatting itself.

/// A cargohold API error. Every variant maps to exactly one S3 error code
/// and HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The specified bucket does not exist.
    #[error("The specified bucket does not exist")]
    NoSuchBucket,
    /// The specified key does not exist.
    #[error("The specified key does not exist")]
    NoSuchKey,
    /// The specified multipart upload does not exist.
    #[error("The specified upload does not exist")]
    NoSuchUpload,
    /// A request argument was invalid.
    #[error("{0}")]
    InvalidArgument(String),
    /// A client-supplied checksum did not match the computed value.
    #[error("The provided checksum value did not match")]
    InvalidChecksum,
    /// A part's ETag did not match on `CompleteMultipartUpload`.
    #[error("One or more of the specified parts could not be found")]
    InvalidPart,
    /// Part numbers were not strictly ascending on `CompleteMultipartUpload`.
    #[error("The list of parts was not in ascending order")]
    InvalidPartOrder,
    /// A requested byte range could not be satisfied.
    #[error("The requested range cannot be satisfied")]
    InvalidRange,
    /// `DeleteBucket` was called on a non-empty bucket without `force`.
    #[error("The bucket you tried to delete is not empty")]
    BucketNotEmpty,
    /// The bucket name failed validation.
    #[error("The specified bucket is not valid: {0}")]
    InvalidBucketName(String),
    /// The bucket already exists and is owned by the caller.
    #[error("Your previous request to create the named bucket succeeded and you already own it")]
    BucketAlreadyOwnedByYou,
    /// The computed signature did not match the request's `Authorization`.
    #[error("The request signature we calculated does not match the signature you provided")]
    SignatureDoesNotMatch,
    /// The request's access key is not recognized.
    #[error("The AWS access key ID you provided does not exist in our records")]
    InvalidAccessKeyId,
    /// A presigned URL's expiration has passed.
    #[error("Presigned URL has expired")]
    RequestTimeTooSkewed,
    /// The authenticated user lacks permission for the requested operation.
    #[error("Access Denied")]
    AccessDenied,
    /// Authentication could not proceed (missing/unsupported auth method).
    #[error("{0}")]
    Unauthenticated(String),
    /// An internal failure (e.g. a lock-acquisition timeout) that has no
    /// client-facing explanation.
    #[error("We encountered an internal error, please try again")]
    Internal,
}

impl ApiError {
    /// The S3 error `Code` element emitted in the `<Error>` XML body.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSuchBucket => "NoSuchBucket",
            Self::NoSuchKey => "NoSuchKey",
            Self::NoSuchUpload => "NoSuchUpload",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::InvalidChecksum => "InvalidChecksum",
            Self::InvalidPart => "InvalidPart",
            Self::InvalidPartOrder => "InvalidPartOrder",
            Self::InvalidRange => "InvalidRange",
            Self::BucketNotEmpty => "BucketNotEmpty",
            Self::InvalidBucketName(_) => "InvalidBucketName",
            Self::BucketAlreadyOwnedByYou => "BucketAlreadyOwnedByYou",
            Self::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            Self::InvalidAccessKeyId => "InvalidAccessKeyId",
            Self::RequestTimeTooSkewed => "RequestTimeTooSkewed",
            Self::AccessDenied => "AccessDenied",
            Self::Unauthenticated(_) => "Unauthenticated",
            Self::Internal => "InternalError",
        }
    }

    /// The HTTP status code this error is reported under.
    #[must_use]
    pub fn http_status(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Self::NoSuchBucket | Self::NoSuchKey | Self::NoSuchUpload => StatusCode::NOT_FOUND,
            Self::InvalidArgument(_)
            | Self::InvalidChecksum
            | Self::InvalidPart
            | Self::InvalidPartOrder
            | Self::InvalidBucketName(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRange => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::BucketNotEmpty => StatusCode::CONFLICT,
            Self::BucketAlreadyOwnedByYou => StatusCode::CONFLICT,
            Self::SignatureDoesNotMatch
            | Self::InvalidAccessKeyId
            | Self::RequestTimeTooSkewed
            | Self::AccessDenied
            | Self::Unauthenticated(_) => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
