//! The data-model types: buckets, objects, multipart uploads, parts, and
//! the checksum algorithm enumeration they all share. Kept free of any
//! wire-format DTOs so the engine and HTTP layers share one plain
//! representation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The five checksum algorithms the gateway supports, keyed by their AWS
/// header name (`x-amz-checksum-<name>`, lowercased).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChecksumAlgorithm {
    /// CRC-32 (IEEE 802.3).
    Crc32,
    /// CRC-32C (Castagnoli).
    Crc32c,
    /// CRC-64/NVME.
    Crc64Nvme,
    /// SHA-1.
    Sha1,
    /// SHA-256.
    Sha256,
}

impl ChecksumAlgorithm {
    /// All five supported algorithms, in the order they're tried when a
    /// caller asks "does this object have any checksum at all".
    pub const ALL: [Self; 5] = [
        Self::Crc32,
        Self::Crc32c,
        Self::Crc64Nvme,
        Self::Sha1,
        Self::Sha256,
    ];

    /// The AWS canonical name, e.g. `CRC32C`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crc32 => "CRC32",
            Self::Crc32c => "CRC32C",
            Self::Crc64Nvme => "CRC64NVME",
            Self::Sha1 => "SHA1",
            Self::Sha256 => "SHA256",
        }
    }

    /// The lowercase form used in the `x-amz-checksum-<name>` header.
    #[must_use]
    pub fn header_suffix(self) -> &'static str {
        match self {
            Self::Crc32 => "crc32",
            Self::Crc32c => "crc32c",
            Self::Crc64Nvme => "crc64nvme",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ChecksumAlgorithm {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChecksumAlgorithm {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Error returned by [`ChecksumAlgorithm::from_str`] for an unrecognized name.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown checksum algorithm: {0}")]
pub struct ParseChecksumAlgorithmError(pub String);

impl FromStr for ChecksumAlgorithm {
    type Err = ParseChecksumAlgorithmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CRC32" => Ok(Self::Crc32),
            "CRC32C" => Ok(Self::Crc32c),
            "CRC64NVME" => Ok(Self::Crc64Nvme),
            "SHA1" => Ok(Self::Sha1),
            "SHA256" => Ok(Self::Sha256),
            _ => Err(ParseChecksumAlgorithmError(s.to_owned())),
        }
    }
}

/// A set of base64-encoded checksum values keyed by algorithm, stored
/// alongside an object or a part.
pub type ChecksumMap = BTreeMap<ChecksumAlgorithm, String>;

/// The object owner. ACLs are out of scope, so every
/// object and bucket shares one fixed owner; it exists only because AWS SDKs
/// expect the `<Owner>` element to be present in list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    /// Display name of the owner.
    pub display_name: String,
    /// Opaque owner identifier.
    pub id: String,
}

impl Default for Owner {
    fn default() -> Self {
        Self {
            display_name: "cargohold".to_owned(),
            id: "75aa57f09aa0c8caeab4f8c24e99d10f8e7faeebf76c078efc7c6caea54ba06a".to_owned(),
        }
    }
}

/// A bucket variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BucketType {
    /// Standard bucket with lexicographic listing.
    GeneralPurpose,
    /// Directory bucket with restricted delimiter/prefix rules.
    Directory,
}

impl Default for BucketType {
    fn default() -> Self {
        Self::GeneralPurpose
    }
}

/// Bucket metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketRecord {
    /// Bucket name.
    pub name: String,
    /// Creation timestamp (UTC, millisecond precision).
    pub creation_date: DateTime<Utc>,
    /// Bucket region.
    pub region: String,
    /// Bucket variant.
    pub bucket_type: BucketType,
    /// Free-form storage class (`EXPRESS_ONEZONE` for directory buckets).
    pub storage_class: String,
    /// User-assigned tags.
    pub tags: BTreeMap<String, String>,
    /// The bucket owner.
    pub owner: Owner,
}

impl BucketRecord {
    /// Build a new record with sensible defaults for the given bucket type.
    #[must_use]
    pub fn new(name: String, region: String, bucket_type: BucketType) -> Self {
        let storage_class = match bucket_type {
            BucketType::Directory => "EXPRESS_ONEZONE".to_owned(),
            BucketType::GeneralPurpose => "STANDARD".to_owned(),
        };
        Self {
            name,
            creation_date: Utc::now(),
            region,
            bucket_type,
            storage_class,
            tags: BTreeMap::new(),
            owner: Owner::default(),
        }
    }
}

/// Object metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRecord {
    /// Object key.
    pub key: String,
    /// Bucket the object lives in.
    pub bucket: String,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time (UTC, millisecond precision).
    pub last_modified: DateTime<Utc>,
    /// ETag: hex MD5 for a single put, `<hex>-<n>` for a completed multipart upload.
    pub etag: String,
    /// Declared content type.
    pub content_type: String,
    /// User metadata (`x-amz-meta-*` keys, case preserved).
    pub user_metadata: BTreeMap<String, String>,
    /// Any checksums computed for this object.
    pub checksums: ChecksumMap,
}

/// A single part of an in-progress multipart upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRecord {
    /// Part number, 1..=10000.
    pub part_number: u32,
    /// Hex MD5 of the part's bytes.
    pub etag: String,
    /// Size in bytes.
    pub size: u64,
    /// Upload time.
    pub last_modified: DateTime<Utc>,
    /// Any checksum computed for this part.
    pub checksums: ChecksumMap,
}

/// An in-progress or completed-pending-cleanup multipart upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipartUploadRecord {
    /// Opaque upload identifier.
    pub upload_id: String,
    /// Destination bucket.
    pub bucket: String,
    /// Destination key.
    pub key: String,
    /// Initiation time.
    pub initiated: DateTime<Utc>,
    /// Content type to apply to the completed object.
    pub content_type: String,
    /// User metadata to apply to the completed object.
    pub user_metadata: BTreeMap<String, String>,
    /// Checksum algorithm declared at initiation, if any.
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    /// Parts uploaded so far, keyed by part number.
    pub parts: BTreeMap<u32, PartRecord>,
}

impl MultipartUploadRecord {
    /// Total size across all parts uploaded so far.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.parts.values().map(|p| p.size).sum()
    }

    /// The highest part number uploaded so far.
    #[must_use]
    pub fn last_part_number(&self) -> Option<u32> {
        self.parts.keys().next_back().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_parse_checksum_algorithm_case_insensitively() {
        assert_eq!(
            "crc32c".parse::<ChecksumAlgorithm>().unwrap(),
            ChecksumAlgorithm::Crc32c
        );
        assert!("md5".parse::<ChecksumAlgorithm>().is_err());
    }

    #[test]
    fn test_should_compute_multipart_total_size_and_last_part() {
        let mut upload = MultipartUploadRecord {
            upload_id: "u1".to_owned(),
            bucket: "b".to_owned(),
            key: "k".to_owned(),
            initiated: Utc::now(),
            content_type: "application/octet-stream".to_owned(),
            user_metadata: BTreeMap::new(),
            checksum_algorithm: None,
            parts: BTreeMap::new(),
        };
        upload.parts.insert(
            1,
            PartRecord {
                part_number: 1,
                etag: "a".to_owned(),
                size: 10,
                last_modified: Utc::now(),
                checksums: ChecksumMap::new(),
            },
        );
        upload.parts.insert(
            3,
            PartRecord {
                part_number: 3,
                etag: "b".to_owned(),
                size: 20,
                last_modified: Utc::now(),
                checksums: ChecksumMap::new(),
            },
        );
        assert_eq!(upload.total_size(), 30);
        assert_eq!(upload.last_part_number(), Some(3));
    }

    #[test]
    fn test_bucket_record_defaults_storage_class_by_type() {
        let general = BucketRecord::new("b".to_owned(), "us-east-1".to_owned(), BucketType::GeneralPurpose);
        assert_eq!(general.storage_class, "STANDARD");
        let directory = BucketRecord::new("b".to_owned(), "us-east-1".to_owned(), BucketType::Directory);
        assert_eq!(directory.storage_class, "EXPRESS_ONEZONE");
    }
}
