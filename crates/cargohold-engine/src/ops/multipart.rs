//! The multipart upload engine.
//!
//! Built around [`crate::storage::Backend`]'s part/upload methods. Part
//! metadata updates are read-merge-write against `update_upload_parts`;
//! the backend implementation owns serializing concurrent writers to the
//! same upload (the filesystem backend does so with
//! [`crate::locks::METADATA_TIMEOUT`]).

use bytes::Bytes;
use cargohold_model::error::ApiError;
use cargohold_model::input::multipart::{
    AbortMultipartUploadInput, CompleteMultipartUploadInput, HeadMultipartUploadInput, InitiateMultipartUploadInput, ListPartsInput,
    UploadPartCopyInput, UploadPartInput,
};
use cargohold_model::output::multipart::{
    CompleteMultipartUploadOutput, HeadMultipartUploadOutput, InitiateMultipartUploadOutput, ListPartsOutput, PartSummary, UploadPartCopyOutput,
    UploadPartOutput,
};
use cargohold_model::types::{ChecksumMap, ObjectRecord, PartRecord};
use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::checksums::{compute_composite_checksum, compute_multipart_etag};
use crate::provider::Engine;
use crate::storage::{self, ByteStream};
use crate::validation::validate_object_key;

fn bytes_to_stream(data: Bytes) -> ByteStream {
    stream::once(async move { Ok(data) }).boxed()
}

fn validate_part_number(n: u32) -> Result<(), ApiError> {
    if (1..=10000).contains(&n) {
        Ok(())
    } else {
        Err(ApiError::InvalidArgument("part number must be between 1 and 10000".to_owned()))
    }
}

fn strip_quotes(etag: &str) -> &str {
    etag.trim_matches('"')
}

/// `POST /<bucket>/<key>?uploads`.
pub async fn initiate_multipart_upload(engine: &Engine, input: InitiateMultipartUploadInput) -> Result<InitiateMultipartUploadOutput, ApiError> {
    engine.storage().get_bucket_metadata(&input.bucket).await?;
    validate_object_key(&input.key)?;

    let record = engine
        .storage()
        .initiate_upload(
            &input.bucket,
            &input.key,
            input.content_type.unwrap_or_else(|| mime_guess::from_path(&input.key).first_or_octet_stream().to_string()),
            input.user_metadata,
            input.checksum_algorithm,
        )
        .await?;

    Ok(InitiateMultipartUploadOutput { bucket: record.bucket, key: record.key, upload_id: record.upload_id })
}

/// `PUT /<bucket>/<key>?partNumber&uploadId` (no copy source).
pub async fn upload_part(engine: &Engine, input: UploadPartInput) -> Result<UploadPartOutput, ApiError> {
    validate_part_number(input.part_number)?;

    let upload = engine.storage().get_upload(&input.upload_id).await?;
    if upload.bucket != input.bucket || upload.key != input.key {
        return Err(ApiError::NoSuchUpload);
    }

    let write = engine
        .storage()
        .store_part(&input.upload_id, input.part_number, bytes_to_stream(input.body), input.checksum_algorithm)
        .await?;
    let checksums: ChecksumMap = storage::checksums_from_pairs(write.checksums);

    if let (Some(algo), Some(expected)) = (input.checksum_algorithm, input.checksum_value.as_ref()) {
        if checksums.get(&algo) != Some(expected) {
            let _ = engine.storage().delete_part(&input.upload_id, input.part_number).await;
            return Err(ApiError::InvalidChecksum);
        }
    }

    let record = PartRecord {
        part_number: input.part_number,
        etag: format!("\"{}\"", write.md5_hex),
        size: write.size,
        last_modified: Utc::now(),
        checksums: checksums.clone(),
    };

    let mut parts = engine.storage().get_upload(&input.upload_id).await?.parts;
    parts.insert(input.part_number, record.clone());
    engine.storage().update_upload_parts(&input.upload_id, parts).await?;

    Ok(UploadPartOutput { etag: record.etag, checksums })
}

/// `PUT /<bucket>/<key>?partNumber&uploadId` with `x-amz-copy-source`.
pub async fn upload_part_copy(engine: &Engine, input: UploadPartCopyInput) -> Result<UploadPartCopyOutput, ApiError> {
    validate_part_number(input.part_number)?;

    let upload = engine.storage().get_upload(&input.upload_id).await?;
    if upload.bucket != input.bucket || upload.key != input.key {
        return Err(ApiError::NoSuchUpload);
    }

    let source = engine.storage().get_object_metadata(&input.source_bucket, &input.source_key).await?;

    let data = match input.source_range {
        Some(range) => {
            if range.start > range.end || range.end >= source.size {
                return Err(ApiError::InvalidRange);
            }
            engine.storage().get_object_data_range(&input.source_bucket, &input.source_key, range.start, range.end).await?
        }
        None => engine.storage().get_object_data(&input.source_bucket, &input.source_key).await?,
    };

    let write = engine.storage().store_part(&input.upload_id, input.part_number, bytes_to_stream(data), None).await?;
    let last_modified = Utc::now();
    let record = PartRecord {
        part_number: input.part_number,
        etag: format!("\"{}\"", write.md5_hex),
        size: write.size,
        last_modified,
        checksums: ChecksumMap::new(),
    };

    let mut parts = engine.storage().get_upload(&input.upload_id).await?.parts;
    parts.insert(input.part_number, record.clone());
    engine.storage().update_upload_parts(&input.upload_id, parts).await?;

    Ok(UploadPartCopyOutput { etag: record.etag, last_modified: record.last_modified })
}

/// `POST /<bucket>/<key>?uploadId`.
pub async fn complete_multipart_upload(engine: &Engine, input: CompleteMultipartUploadInput) -> Result<CompleteMultipartUploadOutput, ApiError> {
    let upload = engine.storage().get_upload(&input.upload_id).await?;
    if upload.bucket != input.bucket || upload.key != input.key {
        return Err(ApiError::NoSuchUpload);
    }
    if input.parts.is_empty() {
        return Err(ApiError::InvalidArgument("completion requires at least one part".to_owned()));
    }
    for pair in input.parts.windows(2) {
        if pair[1].part_number <= pair[0].part_number {
            return Err(ApiError::InvalidPartOrder);
        }
    }

    let part_count = input.parts.len();
    let mut stored_parts = Vec::with_capacity(part_count);
    for completed in &input.parts {
        let stored = upload.parts.get(&completed.part_number).ok_or(ApiError::InvalidPart)?;
        if strip_quotes(&completed.etag) != strip_quotes(&stored.etag) {
            return Err(ApiError::InvalidPart);
        }
        stored_parts.push(stored.clone());
    }

    let storage = engine.storage().clone();
    let upload_id = input.upload_id.clone();
    let part_numbers: Vec<u32> = stored_parts.iter().map(|p| p.part_number).collect();
    let concat_stream: ByteStream = stream::iter(part_numbers)
        .then(move |n| {
            let storage = storage.clone();
            let upload_id = upload_id.clone();
            async move { storage.get_part(&upload_id, n).await.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string())) }
        })
        .boxed();

    let write = engine.storage().store_object_data(&input.bucket, &input.key, concat_stream, &[]).await?;

    let part_md5_hexes: Vec<String> = stored_parts.iter().map(|p| strip_quotes(&p.etag).to_owned()).collect();
    let etag = compute_multipart_etag(&part_md5_hexes, part_count);

    let mut checksums = ChecksumMap::new();
    if let Some(algo) = upload.checksum_algorithm {
        let values: Vec<String> = stored_parts.iter().filter_map(|p| p.checksums.get(&algo).cloned()).collect();
        if values.len() == stored_parts.len() {
            checksums.insert(algo, compute_composite_checksum(algo, &values));
        }
    }

    let record = ObjectRecord {
        key: input.key.clone(),
        bucket: input.bucket.clone(),
        size: write.size,
        last_modified: Utc::now(),
        etag: etag.clone(),
        content_type: upload.content_type.clone(),
        user_metadata: upload.user_metadata.clone(),
        checksums: checksums.clone(),
    };
    engine.storage().store_object_metadata(&record).await?;

    engine.storage().delete_all_parts(&input.upload_id).await?;
    engine.storage().delete_upload(&input.upload_id).await?;

    Ok(CompleteMultipartUploadOutput { bucket: input.bucket, key: input.key, etag, checksums })
}

/// `DELETE /<bucket>/<key>?uploadId`. Idempotent: 204 whether or not it existed.
pub async fn abort_multipart_upload(engine: &Engine, input: AbortMultipartUploadInput) -> Result<(), ApiError> {
    let _ = engine.storage().delete_all_parts(&input.upload_id).await;
    let _ = engine.storage().delete_upload(&input.upload_id).await;
    Ok(())
}

/// `GET /<bucket>/<key>?uploadId`.
pub async fn list_parts(engine: &Engine, input: ListPartsInput) -> Result<ListPartsOutput, ApiError> {
    let upload = engine.storage().get_upload(&input.upload_id).await?;
    if upload.bucket != input.bucket || upload.key != input.key {
        return Err(ApiError::NoSuchUpload);
    }

    let max_parts = if input.max_parts == 0 { ListPartsInput::DEFAULT_MAX_PARTS } else { input.max_parts };

    let mut candidates: Vec<PartRecord> = upload.parts.into_values().collect();
    if let Some(marker) = input.part_number_marker {
        candidates.retain(|p| p.part_number > marker);
    }

    let mut parts = Vec::new();
    let mut is_truncated = false;
    let mut next_marker = None;
    for p in candidates {
        if parts.len() as u32 >= max_parts {
            is_truncated = true;
            break;
        }
        next_marker = Some(p.part_number);
        parts.push(PartSummary { part_number: p.part_number, etag: p.etag, size: p.size, last_modified: p.last_modified, checksums: p.checksums });
    }

    Ok(ListPartsOutput {
        bucket: input.bucket,
        key: input.key,
        upload_id: input.upload_id,
        parts,
        max_parts,
        is_truncated,
        next_part_number_marker: if is_truncated { next_marker } else { None },
    })
}

/// `HEAD /<bucket>/<key>?uploadId`.
pub async fn head_multipart_upload(engine: &Engine, input: HeadMultipartUploadInput) -> Result<HeadMultipartUploadOutput, ApiError> {
    let upload = engine.storage().get_upload(&input.upload_id).await?;
    if upload.bucket != input.bucket || upload.key != input.key {
        return Err(ApiError::NoSuchUpload);
    }
    Ok(HeadMultipartUploadOutput { parts_count: upload.parts.len(), last_part_number: upload.last_part_number(), total_size: upload.total_size() })
}
