//! Routes a resolved [`RoutingContext`] to the matching `cargohold_engine`
//! operation and turns its output into an HTTP response.
//!
//! cargohold has exactly one provider (`cargohold_engine::provider::Engine`),
//! so dispatch calls it directly rather than going through a pluggable
//! handler trait.

use bytes::Bytes;
use cargohold_engine::ops::{bucket, list, multipart, object};
use cargohold_engine::provider::Engine;
use cargohold_model::S3Operation;
use cargohold_model::error::ApiError;

use crate::body::S3ResponseBody;
use crate::router::RoutingContext;
use crate::{request, response};

/// Parse the request, call the matching engine operation, and serialize the
/// response. Errors at any stage are propagated for the caller to turn into
/// an `<Error>` response.
pub async fn dispatch(engine: &Engine, parts: http::request::Parts, body: Bytes, ctx: RoutingContext) -> Result<http::Response<S3ResponseBody>, ApiError> {
    match ctx.operation {
        S3Operation::ListBuckets => {
            let output = bucket::list_buckets(engine).await?;
            response::list_buckets_response(&output)
        }
        S3Operation::CreateBucket => {
            let input = request::create_bucket_input(&parts, &ctx)?;
            let output = bucket::create_bucket(engine, input).await?;
            Ok(response::bucket_info_response(&output))
        }
        S3Operation::DeleteBucket => {
            let input = request::delete_bucket_input(&ctx)?;
            bucket::delete_bucket(engine, input).await?;
            Ok(response::delete_bucket_response())
        }
        S3Operation::HeadBucket => {
            let input = request::head_bucket_input(&ctx)?;
            let output = bucket::head_bucket(engine, input).await?;
            Ok(response::bucket_info_response(&output))
        }
        S3Operation::ListObjects => {
            let input = request::list_objects_input(&ctx)?;
            let output = list::list_objects(engine, input).await?;
            response::list_objects_response(&output)
        }
        S3Operation::ListMultipartUploads => {
            let input = request::list_multipart_uploads_input(&ctx)?;
            let output = list::list_multipart_uploads(engine, input).await?;
            response::list_multipart_uploads_response(&output)
        }
        S3Operation::InitiateMultipartUpload => {
            let input = request::initiate_multipart_upload_input(&parts, &ctx)?;
            let output = multipart::initiate_multipart_upload(engine, input).await?;
            response::initiate_multipart_upload_response(&output)
        }
        S3Operation::UploadPart => {
            let input = request::upload_part_input(&parts, &ctx, body)?;
            let output = multipart::upload_part(engine, input).await?;
            Ok(response::upload_part_response(&output))
        }
        S3Operation::UploadPartCopy => {
            let input = request::upload_part_copy_input(&parts, &ctx)?;
            let output = multipart::upload_part_copy(engine, input).await?;
            response::upload_part_copy_response(&output)
        }
        S3Operation::CompleteMultipartUpload => {
            let input = request::complete_multipart_upload_input(&ctx, &body)?;
            let output = multipart::complete_multipart_upload(engine, input).await?;
            response::complete_multipart_upload_response(&output)
        }
        S3Operation::AbortMultipartUpload => {
            let input = request::abort_multipart_upload_input(&ctx)?;
            multipart::abort_multipart_upload(engine, input).await?;
            Ok(response::abort_multipart_upload_response())
        }
        S3Operation::ListParts => {
            let input = request::list_parts_input(&ctx)?;
            let output = multipart::list_parts(engine, input).await?;
            response::list_parts_response(&output)
        }
        S3Operation::HeadMultipartUpload => {
            let input = request::head_multipart_upload_input(&ctx)?;
            let output = multipart::head_multipart_upload(engine, input).await?;
            Ok(response::head_multipart_upload_response(&output))
        }
        S3Operation::PutObject => {
            let input = request::put_object_input(&parts, &ctx, body)?;
            let output = object::put_object(engine, input).await?;
            Ok(response::put_object_response(&output))
        }
        S3Operation::CopyObject => {
            let input = request::copy_object_input(&parts, &ctx)?;
            let output = object::copy_object(engine, input).await?;
            response::copy_object_response(&output)
        }
        S3Operation::GetObject => {
            let input = request::get_object_input(&parts, &ctx)?;
            let output = object::get_object(engine, input).await?;
            Ok(response::get_object_response(output, false))
        }
        S3Operation::HeadObject => {
            let input = request::get_object_input(&parts, &ctx)?;
            let output = object::get_object(engine, input).await?;
            Ok(response::get_object_response(output, true))
        }
        S3Operation::DeleteObject => {
            let input = request::delete_object_input(&ctx)?;
            object::delete_object(engine, input).await?;
            Ok(response::delete_object_response())
        }
    }
}
