//! Configuration surface for the cargohold gateway.
//!
//! Env-driven configuration loaded via `GatewayConfig::from_env`, with
//! nested sections for `Authentication`, `FilesystemStorage`,
//! `MetadataCleanup`, `BucketDefaults`, and `MultipartUploadCleanup`. A JSON
//! file, if pointed to by `CARGOHOLD_CONFIG_FILE`, is merged on top of the
//! environment defaults so operators can check in a single config artifact.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::keystore::S3User;
use crate::types::{BucketType, Region};

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageType {
    /// Keep all object/bucket/upload state in memory; nothing survives a restart.
    InMemory,
    /// Persist object data and metadata under configured directories.
    Filesystem,
}

impl Default for StorageType {
    fn default() -> Self {
        Self::InMemory
    }
}

/// Default bucket type new buckets are created with when the client does
/// not specify `x-amz-bucket-type`.
pub type BucketDefaultType = BucketType;

/// `Authentication.*` configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthenticationConfig {
    /// When `false`, every request is accepted under an anonymous identity
    /// with unrestricted permissions.
    pub enabled: bool,
    /// The configured users and their bucket permissions.
    pub users: Vec<S3User>,
}

/// `FilesystemStorage.*` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemStorageConfig {
    /// Root directory object bytes are written under.
    pub data_directory: String,
    /// Root directory metadata JSON files are written under.
    pub metadata_directory: String,
}

impl Default for FilesystemStorageConfig {
    fn default() -> Self {
        Self {
            data_directory: "./data/cargohold/objects".to_owned(),
            metadata_directory: "./data/cargohold/metadata".to_owned(),
        }
    }
}

/// `MetadataCleanup.*` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataCleanupConfig {
    /// How often the orphan sweep runs.
    pub cleanup_interval_minutes: u64,
    /// Maximum number of orphaned records removed per sweep.
    pub batch_size: usize,
}

impl Default for MetadataCleanupConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_minutes: 15,
            batch_size: 500,
        }
    }
}

/// `BucketDefaults.*` configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketDefaultsConfig {
    /// Bucket type assigned when a `CreateBucket` request omits `x-amz-bucket-type`.
    #[serde(rename = "type")]
    pub bucket_type: BucketDefaultType,
}

/// `MultipartUploadCleanup.*` configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultipartUploadCleanupConfig {
    /// Whether stale multipart uploads are periodically aborted.
    pub enabled: bool,
}

impl Default for MultipartUploadCleanupConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bind address for the HTTP listener.
    pub gateway_listen: String,
    /// Default region reported for buckets that don't specify one.
    pub default_region: Region,
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Virtual-hosting domain suffix (e.g. `s3.localhost`).
    pub s3_domain: String,
    /// Whether virtual-hosted-style bucket addressing is enabled.
    pub s3_virtual_hosting: bool,
    /// Authentication configuration.
    pub authentication: AuthenticationConfig,
    /// Which storage backend to instantiate.
    pub storage_type: StorageType,
    /// Filesystem backend paths (used when `storage_type` is `Filesystem`).
    pub filesystem_storage: FilesystemStorageConfig,
    /// Background metadata cleanup configuration.
    pub metadata_cleanup: MetadataCleanupConfig,
    /// Defaults applied to newly created buckets.
    pub bucket_defaults: BucketDefaultsConfig,
    /// Stale multipart upload cleanup configuration.
    pub multipart_upload_cleanup: MultipartUploadCleanupConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            gateway_listen: "0.0.0.0:4566".to_owned(),
            default_region: Region::default(),
            log_level: "info".to_owned(),
            s3_domain: "s3.localhost".to_owned(),
            s3_virtual_hosting: true,
            authentication: AuthenticationConfig::default(),
            storage_type: StorageType::default(),
            filesystem_storage: FilesystemStorageConfig::default(),
            metadata_cleanup: MetadataCleanupConfig::default(),
            bucket_defaults: BucketDefaultsConfig::default(),
            multipart_upload_cleanup: MultipartUploadCleanupConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables, optionally merging a
    /// JSON file named by `CARGOHOLD_CONFIG_FILE` on top.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError`] if `CARGOHOLD_CONFIG_FILE` is set but the file
    /// cannot be read or does not parse as valid configuration JSON, or if
    /// `BucketDefaults.Type` names an unrecognized bucket type.
    pub fn from_env() -> CoreResult<Self> {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("GATEWAY_LISTEN") {
            config.gateway_listen = v;
        }
        if let Ok(v) = std::env::var("DEFAULT_REGION") {
            config.default_region = Region::new(v);
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }
        if let Ok(v) = std::env::var("S3_DOMAIN") {
            config.s3_domain = v;
        }
        if let Ok(v) = std::env::var("S3_VIRTUAL_HOSTING") {
            config.s3_virtual_hosting = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("AUTHENTICATION_ENABLED") {
            config.authentication.enabled = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("STORAGE_TYPE") {
            config.storage_type = match v.as_str() {
                "Filesystem" | "filesystem" => StorageType::Filesystem,
                _ => StorageType::InMemory,
            };
        }
        if let Ok(v) = std::env::var("FILESYSTEM_DATA_DIRECTORY") {
            config.filesystem_storage.data_directory = v;
        }
        if let Ok(v) = std::env::var("FILESYSTEM_METADATA_DIRECTORY") {
            config.filesystem_storage.metadata_directory = v;
        }
        if let Ok(v) = std::env::var("BUCKET_DEFAULTS_TYPE") {
            config.bucket_defaults.bucket_type = v.parse()?;
        }
        if let Ok(v) = std::env::var("MULTIPART_UPLOAD_CLEANUP_ENABLED") {
            config.multipart_upload_cleanup.enabled = parse_bool(&v);
        }

        if let Ok(path) = std::env::var("CARGOHOLD_CONFIG_FILE") {
            config.merge_json_file(Path::new(&path))?;
        }

        Ok(config)
    }

    /// Overlay the fields present in a JSON configuration file onto `self`.
    fn merge_json_file(&mut self, path: &Path) -> CoreResult<()> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("reading {}: {e}", path.display())))?;
        let file_config: Self = serde_json::from_str(&contents)
            .map_err(|e| CoreError::Config(format!("parsing {}: {e}", path.display())))?;
        *self = file_config;
        Ok(())
    }
}

fn parse_bool(v: &str) -> bool {
    v == "1" || v.eq_ignore_ascii_case("true")
}
