//! Bootstrap-time error type for configuration and keystore loading.

/// Error raised while loading configuration or building the keystore.
///
/// Per-request errors (missing bucket, bad signature, ...) live in
/// `cargohold-model::error::ApiError`; this type only covers process
/// bootstrap, which is why the server's `main` converts it with `anyhow`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A configuration value was present but malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Wraps any other bootstrap failure (e.g. I/O while reading a config file).
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience result alias for bootstrap-time operations.
pub type CoreResult<T> = Result<T, CoreError>;
