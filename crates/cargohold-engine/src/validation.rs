//! Bucket name, object key, tag, and metadata validation.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use cargohold_model::error::ApiError;

const MIN_BUCKET_NAME_LEN: usize = 3;
const MAX_BUCKET_NAME_LEN: usize = 63;
const MAX_KEY_BYTES: usize = 1024;
const MAX_TAGS: usize = 10;
const MAX_TAG_KEY_LEN: usize = 128;
const MAX_TAG_VALUE_LEN: usize = 256;
const MAX_METADATA_SIZE: usize = 2048;

/// Validate an S3 bucket name against the standard naming rules.
///
/// - 3-63 characters, lowercase ASCII letters, digits, `.` and `-` only
/// - must not start or end with `.` or `-`
/// - must not contain `..`, `.-`, or `-.`
/// - must not parse as an IPv4 literal
/// - must not start with `xn--` or `sthree-`, and must not start with `amzn-s3-demo-`
/// - must not end with `-s3alias`
///
/// # Errors
///
/// Returns [`ApiError::InvalidBucketName`] describing the violated rule.
pub fn validate_bucket_name(name: &str) -> Result<(), ApiError> {
    let len = name.len();

    if !(MIN_BUCKET_NAME_LEN..=MAX_BUCKET_NAME_LEN).contains(&len) {
        return Err(ApiError::InvalidBucketName(format!(
            "bucket name must be between {MIN_BUCKET_NAME_LEN} and {MAX_BUCKET_NAME_LEN} characters long"
        )));
    }

    if !name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.') {
        return Err(ApiError::InvalidBucketName(
            "bucket name must only contain lowercase letters, numbers, hyphens, and dots".to_owned(),
        ));
    }

    let first = name.as_bytes()[0];
    let last = name.as_bytes()[len - 1];
    if first == b'.' || first == b'-' || last == b'.' || last == b'-' {
        return Err(ApiError::InvalidBucketName("bucket name must not start or end with '.' or '-'".to_owned()));
    }

    if name.contains("..") || name.contains(".-") || name.contains("-.") {
        return Err(ApiError::InvalidBucketName(
            "bucket name must not contain '..', '.-', or '-.'".to_owned(),
        ));
    }

    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(ApiError::InvalidBucketName("bucket name must not be formatted as an IP address".to_owned()));
    }

    if name.starts_with("xn--") {
        return Err(ApiError::InvalidBucketName("bucket name must not start with 'xn--'".to_owned()));
    }

    if name.starts_with("sthree-") {
        return Err(ApiError::InvalidBucketName("bucket name must not start with 'sthree-'".to_owned()));
    }

    if name.starts_with("amzn-s3-demo-") {
        return Err(ApiError::InvalidBucketName("bucket name must not start with 'amzn-s3-demo-'".to_owned()));
    }

    if name.ends_with("-s3alias") {
        return Err(ApiError::InvalidBucketName("bucket name must not end with '-s3alias'".to_owned()));
    }

    Ok(())
}

/// Validate an S3 object key: 1-1024 bytes, any valid UTF-8.
///
/// # Errors
///
/// Returns [`ApiError::InvalidArgument`] if the key is empty or too long.
pub fn validate_object_key(key: &str) -> Result<(), ApiError> {
    if key.is_empty() {
        return Err(ApiError::InvalidArgument("object key must not be empty".to_owned()));
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(ApiError::InvalidArgument(format!("object key must not exceed {MAX_KEY_BYTES} bytes")));
    }
    Ok(())
}

/// Validate a tag key: 1-128 characters.
///
/// # Errors
///
/// Returns [`ApiError::InvalidArgument`] if the key is empty or too long.
pub fn validate_tag_key(key: &str) -> Result<(), ApiError> {
    if key.is_empty() {
        return Err(ApiError::InvalidArgument("tag key must not be empty".to_owned()));
    }
    if key.chars().count() > MAX_TAG_KEY_LEN {
        return Err(ApiError::InvalidArgument(format!("tag key must not exceed {MAX_TAG_KEY_LEN} characters")));
    }
    Ok(())
}

/// Validate a tag value: 0-256 characters.
///
/// # Errors
///
/// Returns [`ApiError::InvalidArgument`] if the value is too long.
pub fn validate_tag_value(value: &str) -> Result<(), ApiError> {
    if value.chars().count() > MAX_TAG_VALUE_LEN {
        return Err(ApiError::InvalidArgument(format!("tag value must not exceed {MAX_TAG_VALUE_LEN} characters")));
    }
    Ok(())
}

/// Validate a tag set: at most 10 tags, each key/value individually valid.
///
/// # Errors
///
/// Returns [`ApiError::InvalidArgument`] if any rule is violated.
pub fn validate_tags(tags: &[(String, String)]) -> Result<(), ApiError> {
    if tags.len() > MAX_TAGS {
        return Err(ApiError::InvalidArgument(format!("bucket/object tags cannot exceed {MAX_TAGS}, got {}", tags.len())));
    }
    for (key, value) in tags {
        validate_tag_key(key)?;
        validate_tag_value(value)?;
    }
    Ok(())
}

/// Validate user-defined metadata: combined key+value size must not exceed 2 KB.
///
/// # Errors
///
/// Returns [`ApiError::InvalidArgument`] if the total size exceeds the limit.
pub fn validate_metadata(metadata: &HashMap<String, String>) -> Result<(), ApiError> {
    let total_size: usize = metadata.iter().map(|(k, v)| k.len() + v.len()).sum();
    if total_size > MAX_METADATA_SIZE {
        return Err(ApiError::InvalidArgument(format!(
            "user-defined metadata must not exceed {MAX_METADATA_SIZE} bytes, got {total_size}"
        )));
    }
    Ok(())
}
