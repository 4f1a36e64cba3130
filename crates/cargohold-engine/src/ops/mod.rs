//! Operation handlers.
//!
//! Each submodule exposes free functions taking `&Engine` and a
//! `cargohold_model::input::*` DTO, returning a `cargohold_model::output::*`
//! DTO or an [`cargohold_model::error::ApiError`]. `cargohold-http` is the
//! only caller; these functions have no knowledge of HTTP.

pub mod bucket;
pub mod list;
pub mod multipart;
pub mod object;

/// Convert the gateway's config-layer bucket type into the wire/domain one
/// used by `BucketRecord`. The two enums exist because `cargohold-core` is
/// the configuration crate and must not depend on `cargohold-model`'s wire
/// types; they carry the same two variants by construction.
#[must_use]
pub(crate) fn bucket_type_from_core(core: cargohold_core::BucketType) -> cargohold_model::types::BucketType {
    match core {
        cargohold_core::BucketType::GeneralPurpose => cargohold_model::types::BucketType::GeneralPurpose,
        cargohold_core::BucketType::Directory => cargohold_model::types::BucketType::Directory,
    }
}
