//! Error types for SigV4 authentication.

/// Errors that can occur while authenticating an AWS Signature Version 4 request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Neither an `Authorization` header nor presigned query parameters were present.
    #[error("Missing Authorization header")]
    MissingAuthHeader,
    /// The `Authorization` header could not be parsed.
    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,
    /// The signing algorithm is not `AWS4-HMAC-SHA256`.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),
    /// A header referenced in `SignedHeaders` is missing from the request.
    #[error("Missing required header: {0}")]
    MissingHeader(String),
    /// The `Credential` component does not match `AKID/date/region/service/aws4_request`.
    #[error("Invalid credential format")]
    InvalidCredential,
    /// The access key ID was not found in the keystore.
    #[error("Access key not found: {0}")]
    AccessKeyNotFound(String),
    /// The computed signature does not match the provided one.
    #[error("Signature does not match")]
    SignatureDoesNotMatch,
    /// The presigned URL's expiration has passed.
    #[error("Request has expired")]
    RequestExpired,
    /// A required presigned URL query parameter is missing.
    #[error("Missing required query parameter: {0}")]
    MissingQueryParam(String),
    /// A chunked upload's per-chunk signature did not match.
    #[error("Chunk signature does not match")]
    ChunkSignatureDoesNotMatch,
}
