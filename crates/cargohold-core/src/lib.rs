//! Shared foundation for the cargohold S3-compatible gateway.
//!
//! This crate holds the pieces every other `cargohold-*` crate depends on:
//! the region/type primitives, the [`GatewayConfig`] loader, the error type
//! used for configuration/bootstrap failures, and the [`Keystore`] that maps
//! access keys to users and their bucket permissions.

mod config;
mod error;
mod keystore;
mod types;

pub use config::{
    AuthenticationConfig, BucketDefaultType, BucketDefaultsConfig, FilesystemStorageConfig, GatewayConfig,
    MetadataCleanupConfig, MultipartUploadCleanupConfig, StorageType,
};
pub use error::{CoreError, CoreResult};
pub use keystore::{BucketPermission, Keystore, Permission, S3User};
pub use types::{BucketType, Region};
