//! AWS Signature Version 4 request authentication for the cargohold S3 gateway.
//!
//! This crate verifies incoming HTTP requests against a credential store,
//! supporting both header-based authentication (the `Authorization` header)
//! and presigned URLs (`X-Amz-*` query parameters). It does not know how
//! the credential store is populated; see [`credentials::CredentialProvider`].
//!
//! # Modules
//!
//! - [`canonical`] - canonical request construction per the SigV4 spec
//! - [`credentials`] - the lookup trait and cargohold's keystore-backed impl
//! - [`error`] - authentication error types
//! - [`presigned`] - presigned URL verification
//! - [`sigv4`] - header-based signature verification

pub mod canonical;
pub mod credentials;
pub mod error;
pub mod presigned;
pub mod sigv4;

pub use credentials::{CredentialProvider, KeystoreCredentialProvider};
pub use error::AuthError;
pub use presigned::verify_presigned;
pub use sigv4::{AuthResult, hash_payload, verify_sigv4};
