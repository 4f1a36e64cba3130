//! Bucket CRUD operation handlers: `CreateBucket`, `DeleteBucket`,
//! `HeadBucket`, `ListBuckets`.
//!
//! Inputs and outputs are `cargohold-model`'s own structs rather than any
//! third-party wire-format DTO.

use cargohold_model::error::ApiError;
use cargohold_model::input::bucket::{CreateBucketInput, DeleteBucketInput, HeadBucketInput};
use cargohold_model::output::bucket::{BucketInfoOutput, BucketSummary, ListBucketsOutput};
use cargohold_model::types::{BucketRecord, Owner};

use crate::provider::Engine;
use crate::validation::validate_bucket_name;

/// `PUT /<bucket>`.
pub async fn create_bucket(engine: &Engine, input: CreateBucketInput) -> Result<BucketInfoOutput, ApiError> {
    validate_bucket_name(&input.bucket)?;

    if engine.storage().bucket_data_exists(&input.bucket).await? {
        return Err(ApiError::BucketAlreadyOwnedByYou);
    }

    let bucket_type = input
        .bucket_type
        .unwrap_or_else(|| super::bucket_type_from_core(engine.config().bucket_defaults.bucket_type));

    engine.storage().create_bucket_data(&input.bucket).await?;

    let mut record = BucketRecord::new(
        input.bucket.clone(),
        engine.config().default_region.as_str().to_owned(),
        bucket_type,
    );
    if let Some(storage_class) = input.storage_class {
        record.storage_class = storage_class;
    }
    engine.storage().store_bucket_metadata(&record).await?;

    Ok(BucketInfoOutput { bucket_type: record.bucket_type, storage_class: record.storage_class })
}

/// `DELETE /<bucket>`.
pub async fn delete_bucket(engine: &Engine, input: DeleteBucketInput) -> Result<(), ApiError> {
    // Confirm the bucket is known before attempting to tear it down, so a
    // missing bucket reports `NoSuchBucket` rather than a storage-layer error.
    engine.storage().get_bucket_metadata(&input.bucket).await?;

    engine.storage().delete_bucket_data(&input.bucket, false).await?;
    engine.storage().delete_bucket_metadata(&input.bucket).await?;
    Ok(())
}

/// `HEAD /<bucket>`.
pub async fn head_bucket(engine: &Engine, input: HeadBucketInput) -> Result<BucketInfoOutput, ApiError> {
    let record = engine.storage().get_bucket_metadata(&input.bucket).await?;
    Ok(BucketInfoOutput { bucket_type: record.bucket_type, storage_class: record.storage_class })
}

/// `GET /`.
pub async fn list_buckets(engine: &Engine) -> Result<ListBucketsOutput, ApiError> {
    let mut records = engine.storage().get_all_bucket_metadata().await?;
    records.sort_by(|a, b| a.name.cmp(&b.name));

    let buckets = records
        .into_iter()
        .map(|r| BucketSummary { name: r.name, creation_date: r.creation_date })
        .collect();

    Ok(ListBucketsOutput { buckets, owner: Owner::default() })
}
