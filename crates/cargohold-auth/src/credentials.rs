//! Resolving secret access keys for signature verification.

use std::sync::Arc;

use cargohold_core::Keystore;

use crate::error::AuthError;

/// Looks up a secret access key by access key ID.
pub trait CredentialProvider: Send + Sync {
    /// Retrieve the secret access key for `access_key_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AccessKeyNotFound`] if the access key is not recognized.
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError>;
}

/// A [`CredentialProvider`] backed by the gateway's [`Keystore`].
#[derive(Debug, Clone)]
pub struct KeystoreCredentialProvider {
    keystore: Arc<Keystore>,
}

impl KeystoreCredentialProvider {
    /// Wrap a keystore for signature verification.
    #[must_use]
    pub fn new(keystore: Arc<Keystore>) -> Self {
        Self { keystore }
    }
}

impl CredentialProvider for KeystoreCredentialProvider {
    fn get_secret_key(&self, access_key_id: &str) -> Result<String, AuthError> {
        self.keystore
            .secret_key(access_key_id)
            .ok_or_else(|| AuthError::AccessKeyNotFound(access_key_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use cargohold_core::{BucketPermission, Permission, S3User};

    use super::*;

    fn keystore_with_user() -> Arc<Keystore> {
        Arc::new(Keystore::new(
            vec![S3User {
                access_key_id: "AKID".to_owned(),
                secret_access_key: "secret".to_owned(),
                name: "test".to_owned(),
                bucket_permissions: vec![BucketPermission { bucket_name: "*".to_owned(), permissions: vec![Permission::All] }],
            }],
            true,
        ))
    }

    #[test]
    fn test_should_resolve_known_access_key() {
        let provider = KeystoreCredentialProvider::new(keystore_with_user());
        assert_eq!(provider.get_secret_key("AKID").unwrap(), "secret");
    }

    #[test]
    fn test_should_error_for_unknown_access_key() {
        let provider = KeystoreCredentialProvider::new(keystore_with_user());
        assert!(matches!(provider.get_secret_key("NOPE"), Err(AuthError::AccessKeyNotFound(_))));
    }
}
