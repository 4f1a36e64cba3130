//! Bucket/key resolution and operation identification.
//!
//! Virtual-hosted and path-style addressing both resolve to the same
//! [`RoutingContext`]; `identify_operation` and its helpers then narrow the
//! eighteen operations the gateway understands down to one, from nothing
//! more than the method, the presence of a handful of query parameters, and
//! the `x-amz-copy-source` header.

use cargohold_model::S3Operation;
use http::Method;
use percent_encoding::percent_decode_str;

/// An error resolving a request to bucket/key/operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RoutingError {
    /// The method is not valid at this path.
    #[error("method not allowed")]
    MethodNotAllowed,
    /// A `POST` arrived with neither `uploads` nor `uploadId` set.
    #[error("unable to determine the requested operation")]
    UnknownOperation,
}

/// What a request resolved to: the bucket/key it targets, which of the
/// eighteen operations it names, and its parsed query parameters (reused by
/// [`crate::request`] so header/query parsing only happens once per path).
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// Target bucket, if any (absent only for `ListBuckets`).
    pub bucket: Option<String>,
    /// Target object key, if any.
    pub key: Option<String>,
    /// The identified operation.
    pub operation: S3Operation,
    /// Parsed, percent-decoded `key=value` query parameters.
    pub query_params: Vec<(String, String)>,
}

/// Resolves bucket/key/operation out of an incoming request's method, host,
/// path, and query string.
#[derive(Debug, Clone)]
pub struct S3Router {
    /// The virtual-hosting domain suffix, e.g. `s3.localhost`.
    pub domain: String,
    /// Whether `<bucket>.<domain>` addressing is recognized.
    pub virtual_hosting: bool,
}

impl S3Router {
    /// Build a router for the given virtual-hosting domain.
    #[must_use]
    pub fn new(domain: impl Into<String>, virtual_hosting: bool) -> Self {
        Self { domain: domain.into(), virtual_hosting }
    }

    /// Resolve an incoming request to a [`RoutingContext`].
    ///
    /// # Errors
    ///
    /// Returns a [`RoutingError`] if the method/query combination does not
    /// name one of the eighteen supported operations.
    pub fn resolve<B>(&self, req: &http::Request<B>) -> Result<RoutingContext, RoutingError> {
        let query_params = parse_query_params(req.uri().query().unwrap_or(""));

        let virtual_bucket = if self.virtual_hosting {
            req.headers()
                .get(http::header::HOST)
                .and_then(|h| h.to_str().ok())
                .and_then(|host| self.extract_virtual_host_bucket(host))
        } else {
            None
        };

        let (path_bucket, key) = parse_path(req.uri().path());
        let bucket = virtual_bucket.or(path_bucket);

        let operation = identify_operation(req.method(), bucket.as_deref(), key.as_deref(), &query_params, req.headers())?;

        Ok(RoutingContext { bucket, key, operation, query_params })
    }

    fn extract_virtual_host_bucket(&self, host: &str) -> Option<String> {
        let host = host.split(':').next().unwrap_or(host);
        let suffix = format!(".{}", self.domain);
        host.strip_suffix(suffix.as_str()).filter(|b| !b.is_empty()).map(ToOwned::to_owned)
    }
}

fn parse_path(path: &str) -> (Option<String>, Option<String>) {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return (None, None);
    }
    match trimmed.split_once('/') {
        Some((bucket, rest)) if !rest.is_empty() => (Some(decode_uri_component(bucket)), Some(decode_uri_component(rest))),
        Some((bucket, _empty_rest)) => (Some(decode_uri_component(bucket)), None),
        None => (Some(decode_uri_component(trimmed)), None),
    }
}

fn decode_uri_component(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Parse a raw query string into percent-decoded `(key, value)` pairs.
#[must_use]
pub fn parse_query_params(query: &str) -> Vec<(String, String)> {
    if query.is_empty() {
        return Vec::new();
    }
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = decode_uri_component(parts.next().unwrap_or(""));
            let value = decode_uri_component(parts.next().unwrap_or(""));
            (key, value)
        })
        .collect()
}

/// Whether a query parameter is present, regardless of its value.
#[must_use]
pub fn query_has_key(params: &[(String, String)], key: &str) -> bool {
    params.iter().any(|(k, _)| k == key)
}

/// The value of a query parameter, if present.
#[must_use]
pub fn query_value<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
    params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

fn identify_operation(
    method: &Method,
    bucket: Option<&str>,
    key: Option<&str>,
    query: &[(String, String)],
    headers: &http::HeaderMap,
) -> Result<S3Operation, RoutingError> {
    match (bucket, key) {
        (None, _) => {
            if *method == Method::GET {
                Ok(S3Operation::ListBuckets)
            } else {
                Err(RoutingError::MethodNotAllowed)
            }
        }
        (Some(_), None) => identify_bucket_operation(method, query),
        (Some(_), Some(_)) => identify_object_operation(method, query, headers),
    }
}

fn identify_bucket_operation(method: &Method, query: &[(String, String)]) -> Result<S3Operation, RoutingError> {
    match *method {
        Method::GET if query_has_key(query, "uploads") => Ok(S3Operation::ListMultipartUploads),
        Method::GET => Ok(S3Operation::ListObjects),
        Method::PUT => Ok(S3Operation::CreateBucket),
        Method::DELETE => Ok(S3Operation::DeleteBucket),
        Method::HEAD => Ok(S3Operation::HeadBucket),
        _ => Err(RoutingError::MethodNotAllowed),
    }
}

fn identify_object_operation(method: &Method, query: &[(String, String)], headers: &http::HeaderMap) -> Result<S3Operation, RoutingError> {
    match *method {
        Method::GET if query_has_key(query, "uploadId") => Ok(S3Operation::ListParts),
        Method::GET => Ok(S3Operation::GetObject),
        Method::HEAD if query_has_key(query, "uploadId") => Ok(S3Operation::HeadMultipartUpload),
        Method::HEAD => Ok(S3Operation::HeadObject),
        Method::PUT => identify_put_object_operation(query, headers),
        Method::DELETE if query_has_key(query, "uploadId") => Ok(S3Operation::AbortMultipartUpload),
        Method::DELETE => Ok(S3Operation::DeleteObject),
        Method::POST if query_has_key(query, "uploads") => Ok(S3Operation::InitiateMultipartUpload),
        Method::POST if query_has_key(query, "uploadId") => Ok(S3Operation::CompleteMultipartUpload),
        Method::POST => Err(RoutingError::UnknownOperation),
        _ => Err(RoutingError::MethodNotAllowed),
    }
}

fn identify_put_object_operation(query: &[(String, String)], headers: &http::HeaderMap) -> Result<S3Operation, RoutingError> {
    let has_copy_source = headers.contains_key("x-amz-copy-source");
    let is_part_upload = query_has_key(query, "partNumber") && query_has_key(query, "uploadId");

    Ok(match (is_part_upload, has_copy_source) {
        (true, true) => S3Operation::UploadPartCopy,
        (true, false) => S3Operation::UploadPart,
        (false, true) => S3Operation::CopyObject,
        (false, false) => S3Operation::PutObject,
    })
}
