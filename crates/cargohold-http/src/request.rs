//! HTTP request parts → `cargohold_model::input::*` DTO extraction.
//!
//! Headers carry per-operation directives (`x-amz-bucket-type`,
//! `x-amz-copy-source`, `Range`, ...), query parameters carry
//! pagination/sub-resource selectors, and an XML body is only expected for
//! `CompleteMultipartUpload`.

use std::collections::BTreeMap;
use std::str::FromStr;

use bytes::Bytes;
use cargohold_model::error::ApiError;
use cargohold_model::input::bucket::{CreateBucketInput, DeleteBucketInput, HeadBucketInput};
use cargohold_model::input::list::{ListMultipartUploadsInput, ListObjectsInput, ListVersion};
use cargohold_model::input::multipart::{
    AbortMultipartUploadInput, CompleteMultipartUploadInput, HeadMultipartUploadInput, InitiateMultipartUploadInput, ListPartsInput,
    UploadPartCopyInput, UploadPartInput,
};
use cargohold_model::input::object::{ByteRange, CopyObjectInput, DeleteObjectInput, GetObjectInput, MetadataDirective, PutObjectInput};
use cargohold_model::types::{BucketType, ChecksumAlgorithm};
use cargohold_xml::deserialize::CompletedMultipartUploadBody;
use cargohold_xml::from_xml;

use crate::router::{RoutingContext, query_value};

fn header_str<'a>(parts: &'a http::request::Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name)?.to_str().ok()
}

fn header_parse<T: FromStr>(parts: &http::request::Parts, name: &str) -> Option<T> {
    header_str(parts, name)?.parse().ok()
}

fn require_bucket(ctx: &RoutingContext) -> Result<String, ApiError> {
    ctx.bucket.clone().ok_or_else(|| ApiError::InvalidArgument("a bucket name is required".to_owned()))
}

fn require_key(ctx: &RoutingContext) -> Result<String, ApiError> {
    ctx.key.clone().ok_or_else(|| ApiError::InvalidArgument("an object key is required".to_owned()))
}

fn require_query(ctx: &RoutingContext, name: &str) -> Result<String, ApiError> {
    query_value(&ctx.query_params, name).map(ToOwned::to_owned).ok_or_else(|| ApiError::InvalidArgument(format!("missing required query parameter {name}")))
}

/// Collect `x-amz-meta-*` headers into a metadata map, key-preserving.
fn collect_user_metadata(parts: &http::request::Parts) -> BTreeMap<String, String> {
    const PREFIX: &str = "x-amz-meta-";
    parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            let suffix = name.as_str().strip_prefix(PREFIX)?;
            Some((suffix.to_owned(), value.to_str().ok()?.to_owned()))
        })
        .collect()
}

fn parse_bucket_type(value: &str) -> BucketType {
    if value.eq_ignore_ascii_case("Directory") { BucketType::Directory } else { BucketType::GeneralPurpose }
}

/// A declared checksum algorithm, from `x-amz-checksum-algorithm` if
/// present, else inferred from whichever `x-amz-checksum-<alg>` header was
/// sent, and the value carried on that header.
fn checksum_algorithm_and_value(parts: &http::request::Parts) -> (Option<ChecksumAlgorithm>, Option<String>) {
    if let Some(algo) = header_parse::<ChecksumAlgorithm>(parts, "x-amz-checksum-algorithm") {
        let value = header_str(parts, &format!("x-amz-checksum-{}", algo.header_suffix())).map(ToOwned::to_owned);
        return (Some(algo), value);
    }
    for algo in ChecksumAlgorithm::ALL {
        if let Some(value) = header_str(parts, &format!("x-amz-checksum-{}", algo.header_suffix())) {
            return (Some(algo), Some(value.to_owned()));
        }
    }
    (None, None)
}

/// Parse `x-amz-copy-source: /<bucket>/<key>` (optionally URL-encoded and
/// without a leading slash, both of which real clients send).
fn parse_copy_source(value: &str) -> Result<(String, String), ApiError> {
    let decoded = percent_encoding::percent_decode_str(value).decode_utf8_lossy();
    let trimmed = decoded.trim_start_matches('/');
    trimmed
        .split_once('/')
        .map(|(b, k)| (b.to_owned(), k.to_owned()))
        .ok_or_else(|| ApiError::InvalidArgument("malformed x-amz-copy-source".to_owned()))
}

/// Parse a `bytes=<start>-<end>` range header (`Range` or
/// `x-amz-copy-source-range`). Only the fully-specified inclusive form is
/// supported; suffix (`bytes=-N`) and open-ended (`bytes=N-`) ranges are
/// rejected as an invalid argument rather than guessed at.
fn parse_byte_range(value: &str) -> Result<ByteRange, ApiError> {
    let spec = value.strip_prefix("bytes=").ok_or_else(|| ApiError::InvalidArgument("malformed range header".to_owned()))?;
    let (start, end) = spec.split_once('-').ok_or_else(|| ApiError::InvalidArgument("malformed range header".to_owned()))?;
    let start: u64 = start.parse().map_err(|_| ApiError::InvalidArgument("malformed range header".to_owned()))?;
    let end: u64 = end.parse().map_err(|_| ApiError::InvalidArgument("malformed range header".to_owned()))?;
    Ok(ByteRange { start, end })
}

pub fn create_bucket_input(parts: &http::request::Parts, ctx: &RoutingContext) -> Result<CreateBucketInput, ApiError> {
    Ok(CreateBucketInput {
        bucket: require_bucket(ctx)?,
        bucket_type: header_str(parts, "x-amz-bucket-type").map(parse_bucket_type),
        storage_class: header_str(parts, "x-amz-storage-class").map(ToOwned::to_owned),
    })
}

pub fn delete_bucket_input(ctx: &RoutingContext) -> Result<DeleteBucketInput, ApiError> {
    Ok(DeleteBucketInput { bucket: require_bucket(ctx)? })
}

pub fn head_bucket_input(ctx: &RoutingContext) -> Result<HeadBucketInput, ApiError> {
    Ok(HeadBucketInput { bucket: require_bucket(ctx)? })
}

pub fn list_objects_input(ctx: &RoutingContext) -> Result<ListObjectsInput, ApiError> {
    let params = &ctx.query_params;
    let version = if query_value(params, "list-type") == Some("2") { ListVersion::V2 } else { ListVersion::V1 };
    let cursor = match version {
        ListVersion::V2 => query_value(params, "continuation-token"),
        ListVersion::V1 => query_value(params, "marker"),
    };

    Ok(ListObjectsInput {
        bucket: require_bucket(ctx)?,
        version,
        prefix: query_value(params, "prefix").unwrap_or("").to_owned(),
        delimiter: query_value(params, "delimiter").map(ToOwned::to_owned),
        cursor: cursor.map(ToOwned::to_owned),
        max_keys: query_value(params, "max-keys").and_then(|v| v.parse().ok()).unwrap_or(ListObjectsInput::DEFAULT_MAX_KEYS),
    })
}

pub fn list_multipart_uploads_input(ctx: &RoutingContext) -> Result<ListMultipartUploadsInput, ApiError> {
    Ok(ListMultipartUploadsInput { bucket: require_bucket(ctx)? })
}

pub fn initiate_multipart_upload_input(parts: &http::request::Parts, ctx: &RoutingContext) -> Result<InitiateMultipartUploadInput, ApiError> {
    let (checksum_algorithm, _) = checksum_algorithm_and_value(parts);
    Ok(InitiateMultipartUploadInput {
        bucket: require_bucket(ctx)?,
        key: require_key(ctx)?,
        content_type: header_str(parts, http::header::CONTENT_TYPE.as_str()).map(ToOwned::to_owned),
        user_metadata: collect_user_metadata(parts),
        checksum_algorithm,
    })
}

pub fn upload_part_input(parts: &http::request::Parts, ctx: &RoutingContext, body: Bytes) -> Result<UploadPartInput, ApiError> {
    let part_number: u32 = require_query(ctx, "partNumber")?.parse().map_err(|_| ApiError::InvalidArgument("malformed partNumber".to_owned()))?;
    let (checksum_algorithm, checksum_value) = checksum_algorithm_and_value(parts);
    Ok(UploadPartInput {
        bucket: require_bucket(ctx)?,
        key: require_key(ctx)?,
        upload_id: require_query(ctx, "uploadId")?,
        part_number,
        body,
        checksum_algorithm,
        checksum_value,
    })
}

pub fn upload_part_copy_input(parts: &http::request::Parts, ctx: &RoutingContext) -> Result<UploadPartCopyInput, ApiError> {
    let part_number: u32 = require_query(ctx, "partNumber")?.parse().map_err(|_| ApiError::InvalidArgument("malformed partNumber".to_owned()))?;
    let copy_source = header_str(parts, "x-amz-copy-source").ok_or_else(|| ApiError::InvalidArgument("missing x-amz-copy-source".to_owned()))?;
    let (source_bucket, source_key) = parse_copy_source(copy_source)?;
    let source_range = header_str(parts, "x-amz-copy-source-range").map(parse_byte_range).transpose()?;

    Ok(UploadPartCopyInput {
        bucket: require_bucket(ctx)?,
        key: require_key(ctx)?,
        upload_id: require_query(ctx, "uploadId")?,
        part_number,
        source_bucket,
        source_key,
        source_range,
    })
}

pub fn complete_multipart_upload_input(ctx: &RoutingContext, body: &Bytes) -> Result<CompleteMultipartUploadInput, ApiError> {
    let parsed: CompletedMultipartUploadBody =
        from_xml(body).map_err(|e| ApiError::InvalidArgument(format!("malformed CompleteMultipartUpload body: {e}")))?;

    Ok(CompleteMultipartUploadInput { bucket: require_bucket(ctx)?, key: require_key(ctx)?, upload_id: require_query(ctx, "uploadId")?, parts: parsed.parts })
}

pub fn abort_multipart_upload_input(ctx: &RoutingContext) -> Result<AbortMultipartUploadInput, ApiError> {
    Ok(AbortMultipartUploadInput { bucket: require_bucket(ctx)?, key: require_key(ctx)?, upload_id: require_query(ctx, "uploadId")? })
}

pub fn list_parts_input(ctx: &RoutingContext) -> Result<ListPartsInput, ApiError> {
    let params = &ctx.query_params;
    Ok(ListPartsInput {
        bucket: require_bucket(ctx)?,
        key: require_key(ctx)?,
        upload_id: require_query(ctx, "uploadId")?,
        part_number_marker: query_value(params, "part-number-marker").and_then(|v| v.parse().ok()),
        max_parts: query_value(params, "max-parts").and_then(|v| v.parse().ok()).unwrap_or(ListPartsInput::DEFAULT_MAX_PARTS),
    })
}

pub fn head_multipart_upload_input(ctx: &RoutingContext) -> Result<HeadMultipartUploadInput, ApiError> {
    Ok(HeadMultipartUploadInput { bucket: require_bucket(ctx)?, key: require_key(ctx)?, upload_id: require_query(ctx, "uploadId")? })
}

pub fn put_object_input(parts: &http::request::Parts, ctx: &RoutingContext, body: Bytes) -> Result<PutObjectInput, ApiError> {
    let (checksum_algorithm, checksum_value) = checksum_algorithm_and_value(parts);
    Ok(PutObjectInput {
        bucket: require_bucket(ctx)?,
        key: require_key(ctx)?,
        body,
        content_type: header_str(parts, http::header::CONTENT_TYPE.as_str()).map(ToOwned::to_owned),
        user_metadata: collect_user_metadata(parts),
        checksum_algorithm,
        checksum_value,
    })
}

pub fn copy_object_input(parts: &http::request::Parts, ctx: &RoutingContext) -> Result<CopyObjectInput, ApiError> {
    let copy_source = header_str(parts, "x-amz-copy-source").ok_or_else(|| ApiError::InvalidArgument("missing x-amz-copy-source".to_owned()))?;
    let (source_bucket, source_key) = parse_copy_source(copy_source)?;
    let metadata_directive = header_str(parts, "x-amz-metadata-directive")
        .map(|v| if v.eq_ignore_ascii_case("REPLACE") { MetadataDirective::Replace } else { MetadataDirective::Copy })
        .unwrap_or_default();

    Ok(CopyObjectInput {
        bucket: require_bucket(ctx)?,
        key: require_key(ctx)?,
        source_bucket,
        source_key,
        metadata_directive,
        content_type: header_str(parts, http::header::CONTENT_TYPE.as_str()).map(ToOwned::to_owned),
        user_metadata: collect_user_metadata(parts),
    })
}

pub fn get_object_input(parts: &http::request::Parts, ctx: &RoutingContext) -> Result<GetObjectInput, ApiError> {
    let range = header_str(parts, http::header::RANGE.as_str()).map(parse_byte_range).transpose()?;
    let checksum_mode_enabled = header_str(parts, "x-amz-checksum-mode").is_some_and(|v| v.eq_ignore_ascii_case("ENABLED"));
    Ok(GetObjectInput { bucket: require_bucket(ctx)?, key: require_key(ctx)?, range, checksum_mode_enabled })
}

pub fn delete_object_input(ctx: &RoutingContext) -> Result<DeleteObjectInput, ApiError> {
    Ok(DeleteObjectInput { bucket: require_bucket(ctx)?, key: require_key(ctx)? })
}
