//! Common type definitions shared across the cargohold crates.

use std::fmt;

/// AWS-style region identifier attached to a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Region(String);

impl Region {
    /// Region assumed when a client does not specify one.
    pub const DEFAULT: &str = "us-east-1";

    /// Build a region from any string-like value.
    #[must_use]
    pub fn new(region: impl Into<String>) -> Self {
        Self(region.into())
    }

    /// Borrow the region as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Region {
    fn default() -> Self {
        Self(Self::DEFAULT.to_owned())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two bucket variants the data model distinguishes.
///
/// `Directory` buckets impose tighter delimiter/prefix restrictions on
/// listing and report `EXPRESS_ONEZONE` storage class by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BucketType {
    /// A standard, general-purpose bucket.
    GeneralPurpose,
    /// A directory bucket (restricted listing semantics).
    Directory,
}

impl Default for BucketType {
    fn default() -> Self {
        Self::GeneralPurpose
    }
}

impl fmt::Display for BucketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeneralPurpose => f.write_str("GeneralPurpose"),
            Self::Directory => f.write_str("Directory"),
        }
    }
}

impl std::str::FromStr for BucketType {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GeneralPurpose" | "general-purpose" | "" => Ok(Self::GeneralPurpose),
            "Directory" | "directory" => Ok(Self::Directory),
            other => Err(crate::CoreError::Config(format!(
                "invalid bucket type: {other}"
            ))),
        }
    }
}
