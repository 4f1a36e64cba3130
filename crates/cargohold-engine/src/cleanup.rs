//! Background orphan metadata sweep.
//!
//! Every persisted object should have both data and metadata reachable
//! through the backend; a metadata record with no backing data is orphaned
//! and eligible for cleanup. `cargohold-server` drives [`sweep_orphans`] on
//! a `tokio::time::interval` timer per `MetadataCleanup.CleanupIntervalMinutes`.

use tracing::{debug, info};

use crate::provider::Engine;

/// Scan every bucket's object metadata and delete records whose data is
/// missing, stopping once `batch_size` records have been removed. Returns
/// the number of orphans removed.
pub async fn sweep_orphans(engine: &Engine, batch_size: usize) -> usize {
    let mut removed = 0;

    let Ok(buckets) = engine.storage().list_bucket_names().await else {
        return 0;
    };

    'buckets: for bucket in buckets {
        let Ok(records) = engine.storage().list_object_metadata(&bucket).await else {
            continue;
        };

        for record in records {
            if removed >= batch_size {
                break 'buckets;
            }
            match engine.storage().object_data_exists(&bucket, &record.key).await {
                Ok(true) | Err(_) => continue,
                Ok(false) => {}
            }
            if engine.storage().delete_object_metadata(&bucket, &record.key).await.is_ok() {
                debug!(bucket = %bucket, key = %record.key, "removed orphaned object metadata");
                removed += 1;
            }
        }
    }

    if removed > 0 {
        info!(removed, "metadata cleanup sweep complete");
    }
    removed
}
