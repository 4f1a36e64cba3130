//! `cargohold_model::output::*` → HTTP response serialization.
//!
//! Response shapes follow a simple rule: most write operations return
//! metadata only in headers, list/multipart operations return an XML body,
//! `GetObject` streams raw bytes, and errors are flat `<Error>` XML
//! documents. XML serialization is delegated to `cargohold_xml`; this
//! module only decides status code, headers, and which body (if any) to
//! attach.

use bytes::Bytes;
use cargohold_model::error::ApiError;
use cargohold_model::output::bucket::{BucketInfoOutput, ListBucketsOutput};
use cargohold_model::output::list::ListObjectsOutput;
use cargohold_model::output::multipart::{
    CompleteMultipartUploadOutput, HeadMultipartUploadOutput, InitiateMultipartUploadOutput, ListMultipartUploadsOutput, ListPartsOutput,
    UploadPartCopyOutput, UploadPartOutput,
};
use cargohold_model::output::object::{CopyObjectOutput, GetObjectOutput, PutObjectOutput};
use cargohold_model::types::{BucketType, ChecksumMap};
use cargohold_xml::to_xml;
use http::header::HeaderValue;
use http::response::Builder;

use crate::body::S3ResponseBody;

/// Convert a response-builder error into a last-resort 500 so a bad header
/// value never panics the handler.
fn build_response(builder: Builder, body: S3ResponseBody) -> http::Response<S3ResponseBody> {
    builder.body(body).unwrap_or_else(|_| http::Response::builder().status(http::StatusCode::INTERNAL_SERVER_ERROR).body(S3ResponseBody::empty()).expect("static response is valid"))
}

fn set_header(mut builder: Builder, name: &str, value: &str) -> Builder {
    if let Ok(hv) = HeaderValue::from_str(value) {
        builder = builder.header(name, hv);
    }
    builder
}

fn set_optional_header(builder: Builder, name: &str, value: Option<&str>) -> Builder {
    match value {
        Some(v) => set_header(builder, name, v),
        None => builder,
    }
}

fn format_http_date(ts: chrono::DateTime<chrono::Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn bucket_type_str(bucket_type: BucketType) -> &'static str {
    match bucket_type {
        BucketType::GeneralPurpose => "GeneralPurpose",
        BucketType::Directory => "Directory",
    }
}

fn set_checksum_headers(mut builder: Builder, checksums: &ChecksumMap) -> Builder {
    for (algo, value) in checksums {
        builder = set_header(builder, &format!("x-amz-checksum-{}", algo.header_suffix()), value);
    }
    builder
}

fn xml_body(builder: Builder, bytes: Vec<u8>) -> http::Response<S3ResponseBody> {
    let builder = set_header(builder, http::header::CONTENT_TYPE.as_str(), "application/xml");
    build_response(builder, S3ResponseBody::from_bytes(Bytes::from(bytes)))
}

pub fn list_buckets_response(output: &ListBucketsOutput) -> Result<http::Response<S3ResponseBody>, ApiError> {
    let bytes = to_xml("ListAllMyBucketsResult", output).map_err(|_| ApiError::Internal)?;
    Ok(xml_body(http::Response::builder().status(http::StatusCode::OK), bytes))
}

/// `CreateBucket`/`HeadBucket`: headers only, no body.
pub fn bucket_info_response(output: &BucketInfoOutput) -> http::Response<S3ResponseBody> {
    let mut builder = http::Response::builder().status(http::StatusCode::OK);
    builder = set_header(builder, "x-amz-bucket-type", bucket_type_str(output.bucket_type));
    builder = set_header(builder, "x-amz-storage-class", &output.storage_class);
    build_response(builder, S3ResponseBody::empty())
}

pub fn delete_bucket_response() -> http::Response<S3ResponseBody> {
    build_response(http::Response::builder().status(http::StatusCode::NO_CONTENT), S3ResponseBody::empty())
}

pub fn list_objects_response(output: &ListObjectsOutput) -> Result<http::Response<S3ResponseBody>, ApiError> {
    let bytes = to_xml("ListBucketResult", output).map_err(|_| ApiError::Internal)?;
    Ok(xml_body(http::Response::builder().status(http::StatusCode::OK), bytes))
}

pub fn list_multipart_uploads_response(output: &ListMultipartUploadsOutput) -> Result<http::Response<S3ResponseBody>, ApiError> {
    let bytes = to_xml("ListMultipartUploadsResult", output).map_err(|_| ApiError::Internal)?;
    Ok(xml_body(http::Response::builder().status(http::StatusCode::OK), bytes))
}

pub fn initiate_multipart_upload_response(output: &InitiateMultipartUploadOutput) -> Result<http::Response<S3ResponseBody>, ApiError> {
    let bytes = to_xml("InitiateMultipartUploadResult", output).map_err(|_| ApiError::Internal)?;
    Ok(xml_body(http::Response::builder().status(http::StatusCode::OK), bytes))
}

pub fn upload_part_response(output: &UploadPartOutput) -> http::Response<S3ResponseBody> {
    let mut builder = http::Response::builder().status(http::StatusCode::OK);
    builder = set_header(builder, http::header::ETAG.as_str(), &output.etag);
    builder = set_checksum_headers(builder, &output.checksums);
    build_response(builder, S3ResponseBody::empty())
}

pub fn upload_part_copy_response(output: &UploadPartCopyOutput) -> Result<http::Response<S3ResponseBody>, ApiError> {
    let bytes = to_xml("CopyPartResult", output).map_err(|_| ApiError::Internal)?;
    Ok(xml_body(http::Response::builder().status(http::StatusCode::OK), bytes))
}

pub fn complete_multipart_upload_response(output: &CompleteMultipartUploadOutput) -> Result<http::Response<S3ResponseBody>, ApiError> {
    let bytes = to_xml("CompleteMultipartUploadResult", output).map_err(|_| ApiError::Internal)?;
    Ok(xml_body(http::Response::builder().status(http::StatusCode::OK), bytes))
}

pub fn abort_multipart_upload_response() -> http::Response<S3ResponseBody> {
    build_response(http::Response::builder().status(http::StatusCode::NO_CONTENT), S3ResponseBody::empty())
}

pub fn list_parts_response(output: &ListPartsOutput) -> Result<http::Response<S3ResponseBody>, ApiError> {
    let bytes = to_xml("ListPartsResult", output).map_err(|_| ApiError::Internal)?;
    Ok(xml_body(http::Response::builder().status(http::StatusCode::OK), bytes))
}

pub fn head_multipart_upload_response(output: &HeadMultipartUploadOutput) -> http::Response<S3ResponseBody> {
    let mut builder = http::Response::builder().status(http::StatusCode::OK);
    builder = set_header(builder, "x-amz-parts-count", &output.parts_count.to_string());
    if let Some(n) = output.last_part_number {
        builder = set_header(builder, "x-amz-last-part-number", &n.to_string());
    }
    builder = set_header(builder, "x-amz-total-size", &output.total_size.to_string());
    build_response(builder, S3ResponseBody::empty())
}

pub fn put_object_response(output: &PutObjectOutput) -> http::Response<S3ResponseBody> {
    let mut builder = http::Response::builder().status(http::StatusCode::OK);
    builder = set_header(builder, http::header::ETAG.as_str(), &output.etag);
    builder = set_checksum_headers(builder, &output.checksums);
    build_response(builder, S3ResponseBody::empty())
}

pub fn copy_object_response(output: &CopyObjectOutput) -> Result<http::Response<S3ResponseBody>, ApiError> {
    let bytes = to_xml("CopyObjectResult", output).map_err(|_| ApiError::Internal)?;
    Ok(xml_body(http::Response::builder().status(http::StatusCode::OK), bytes))
}

/// `GetObject`/`HeadObject`: headers describing the object plus (for `GetObject`) the
/// raw body. `is_head` suppresses the body; `range` controls 200 vs. 206/`Content-Range`.
pub fn get_object_response(output: GetObjectOutput, is_head: bool) -> http::Response<S3ResponseBody> {
    let status = if output.range.is_some() { http::StatusCode::PARTIAL_CONTENT } else { http::StatusCode::OK };
    let mut builder = http::Response::builder().status(status);
    builder = set_header(builder, http::header::ETAG.as_str(), &output.etag);
    builder = set_header(builder, http::header::LAST_MODIFIED.as_str(), &format_http_date(output.last_modified));
    builder = set_header(builder, http::header::CONTENT_TYPE.as_str(), &output.content_type);
    builder = set_checksum_headers(builder, &output.checksums);
    for (key, value) in &output.user_metadata {
        builder = set_header(builder, &format!("x-amz-meta-{key}"), value);
    }
    if let Some((start, end)) = output.range {
        builder = set_header(builder, http::header::CONTENT_RANGE.as_str(), &format!("bytes {start}-{end}/{}", output.total_size));
        builder = set_header(builder, http::header::CONTENT_LENGTH.as_str(), &(end - start + 1).to_string());
    } else {
        builder = set_header(builder, http::header::CONTENT_LENGTH.as_str(), &output.total_size.to_string());
    }

    let body = if is_head { S3ResponseBody::empty() } else { S3ResponseBody::from_bytes(output.body) };
    build_response(builder, body)
}

pub fn delete_object_response() -> http::Response<S3ResponseBody> {
    build_response(http::Response::builder().status(http::StatusCode::NO_CONTENT), S3ResponseBody::empty())
}

/// Convert an `ApiError` into an HTTP error response with an XML `<Error>` body.
#[must_use]
pub fn error_response(err: &ApiError, resource: Option<&str>, request_id: &str, host_id: &str) -> http::Response<S3ResponseBody> {
    let xml_bytes = cargohold_xml::error_to_xml(err.code(), &err.to_string(), resource, request_id, host_id);
    let body = S3ResponseBody::from_bytes(Bytes::from(xml_bytes));
    let builder = http::Response::builder().status(err.http_status());
    let builder = set_optional_header(builder, http::header::CONTENT_TYPE.as_str(), Some("application/xml"));
    build_response(builder, body)
}
