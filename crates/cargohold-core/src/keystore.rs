//! Access-key → user lookup and the per-bucket permission check.
//!
//! A `dashmap`-keyed, process-wide, concurrently readable map built once
//! at startup from [`crate::config::AuthenticationConfig`].

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// A single permission an [`S3User`] may hold on a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// GET/HEAD operations.
    Read,
    /// PUT/POST operations.
    Write,
    /// DELETE operations.
    Delete,
    /// Bucket listing operations.
    List,
    /// Grants every permission.
    #[serde(rename = "*")]
    All,
}

impl Permission {
    /// The permission implied by an HTTP method, used to check an
    /// incoming request against a user's [`BucketPermission`] entries.
    #[must_use]
    pub fn for_method(method: &http::Method) -> Self {
        match *method {
            http::Method::GET | http::Method::HEAD => Self::Read,
            http::Method::PUT | http::Method::POST => Self::Write,
            http::Method::DELETE => Self::Delete,
            _ => Self::Read,
        }
    }
}

/// A bucket-scoped permission grant. `bucket_name` may be `"*"` to match any
/// bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketPermission {
    /// The bucket this grant applies to, or `"*"` for all buckets.
    pub bucket_name: String,
    /// The permissions granted on that bucket.
    pub permissions: Vec<Permission>,
}

impl BucketPermission {
    fn matches_bucket(&self, bucket: &str) -> bool {
        self.bucket_name == "*" || self.bucket_name.eq_ignore_ascii_case(bucket)
    }

    fn grants(&self, permission: Permission) -> bool {
        self.permissions
            .iter()
            .any(|p| *p == Permission::All || *p == permission)
    }
}

/// A configured gateway user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3User {
    /// The access key ID clients authenticate with.
    pub access_key_id: String,
    /// The shared secret used to derive SigV4 signing keys.
    pub secret_access_key: String,
    /// A human-readable name for logging/diagnostics.
    pub name: String,
    /// The bucket permissions granted to this user.
    pub bucket_permissions: Vec<BucketPermission>,
}

impl S3User {
    /// Returns `true` if this user holds `permission` on `bucket`.
    #[must_use]
    pub fn allows(&self, bucket: &str, permission: Permission) -> bool {
        self.bucket_permissions
            .iter()
            .any(|grant| grant.matches_bucket(bucket) && grant.grants(permission))
    }

    /// A user with unrestricted access, used when authentication is disabled.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            access_key_id: "anonymous".to_owned(),
            secret_access_key: String::new(),
            name: "anonymous".to_owned(),
            bucket_permissions: vec![BucketPermission {
                bucket_name: "*".to_owned(),
                permissions: vec![Permission::All],
            }],
        }
    }
}

/// Process-wide map of access key → [`S3User`].
#[derive(Debug)]
pub struct Keystore {
    users: DashMap<String, S3User>,
    auth_enabled: bool,
}

impl Keystore {
    /// Build a keystore from the configured user list.
    ///
    /// When `auth_enabled` is `false`, [`Keystore::authenticate`]-style
    /// lookups should be bypassed entirely by the caller (the signature
    /// validator never runs); this keystore still answers lookups for the
    /// anonymous user so callers that want a uniform code path can use it.
    #[must_use]
    pub fn new(users: Vec<S3User>, auth_enabled: bool) -> Self {
        let map = DashMap::new();
        for user in users {
            map.insert(user.access_key_id.clone(), user);
        }
        tracing::debug!(user_count = map.len(), auth_enabled, "keystore initialized");
        Self {
            users: map,
            auth_enabled,
        }
    }

    /// Whether SigV4 verification should be enforced at all.
    #[must_use]
    pub fn auth_enabled(&self) -> bool {
        self.auth_enabled
    }

    /// Look up a user's secret key by access key ID.
    #[must_use]
    pub fn secret_key(&self, access_key_id: &str) -> Option<String> {
        self.users
            .get(access_key_id)
            .map(|u| u.secret_access_key.clone())
    }

    /// Look up a user by access key ID, cloning the record out.
    #[must_use]
    pub fn user(&self, access_key_id: &str) -> Option<S3User> {
        self.users.get(access_key_id).map(|u| u.clone())
    }
}
