//! The hyper `Service` that ties routing, authentication, chunk decoding,
//! dispatch, and response formatting into one request pipeline.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use cargohold_auth::credentials::{CredentialProvider, KeystoreCredentialProvider};
use cargohold_auth::sigv4::{hash_payload, parse_authorization_header, verify_sigv4};
use cargohold_auth::{AuthError, AuthResult, presigned};
use cargohold_core::Permission;
use cargohold_engine::provider::Engine;
use cargohold_model::error::ApiError;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::service::Service;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::body::S3ResponseBody;
use crate::chunked::{self, ChunkSigningContext};
use crate::dispatch::dispatch;
use crate::response::error_response;
use crate::router::S3Router;

/// Runtime configuration for the HTTP service, independent of the engine
/// it dispatches to.
#[derive(Clone, Debug)]
pub struct ServiceConfig {
    /// Base domain for virtual-hosted-style bucket addressing.
    pub domain: String,
    /// Whether virtual-hosted-style addressing is enabled.
    pub virtual_hosting: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { domain: "s3.localhost".to_owned(), virtual_hosting: true }
    }
}

/// The cargohold S3 gateway's hyper service.
#[derive(Clone)]
pub struct GatewayService {
    engine: Engine,
    router: S3Router,
}

impl GatewayService {
    /// Build a service around `engine`, routing per `config`.
    #[must_use]
    pub fn new(engine: Engine, config: &ServiceConfig) -> Self {
        Self { router: S3Router::new(&config.domain, config.virtual_hosting), engine }
    }
}

impl Service<http::Request<Incoming>> for GatewayService {
    type Response = http::Response<S3ResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let engine = self.engine.clone();
        let router = self.router.clone();

        Box::pin(async move {
            let request_id = new_request_id();
            let host_id = new_host_id();
            let response = process_request(req, &engine, &router, &request_id, &host_id).await;
            Ok(add_common_headers(response, &request_id, &host_id))
        })
    }
}

/// A 16-character uppercase hex `x-amz-request-id`.
fn new_request_id() -> String {
    let mut s = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
    s.truncate(16);
    s
}

/// A longer, base64-like `x-amz-id-2` token.
fn new_host_id() -> String {
    use base64::Engine as _;
    base64::engine::general_purpose::STANDARD.encode(Uuid::new_v4().as_bytes())
}

async fn process_request(req: http::Request<Incoming>, engine: &Engine, router: &S3Router, request_id: &str, host_id: &str) -> http::Response<S3ResponseBody> {
    let method = req.method().clone();
    let uri = req.uri().clone();
    debug!(%method, %uri, request_id, "processing request");

    if is_health_check(&method, uri.path()) {
        return health_check_response();
    }
    if method == http::Method::OPTIONS {
        return cors_preflight_response();
    }

    let ctx = match router.resolve(&req) {
        Ok(ctx) => ctx,
        Err(err) => {
            warn!(%method, %uri, error = %err, request_id, "failed to route request");
            return error_response(&map_routing_error(&err), Some(uri.path()), request_id, host_id);
        }
    };

    info!(operation = %ctx.operation, bucket = ?ctx.bucket, key = ?ctx.key, request_id, "routed request");

    let (parts, incoming) = req.into_parts();
    let body = match incoming.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, request_id, "failed to collect request body");
            return error_response(&ApiError::Internal, ctx.bucket.as_deref(), request_id, host_id);
        }
    };

    if let Err(err) = validate_content_sha256(&parts, &body) {
        warn!(error = %err, request_id, "content hash validation failed");
        return error_response(&err, ctx.bucket.as_deref(), request_id, host_id);
    }

    let credential_provider = KeystoreCredentialProvider::new(engine.keystore_handle());
    let auth = match authenticate(&parts, &body, engine, &credential_provider) {
        Ok(auth) => auth,
        Err(err) => {
            warn!(error = %err, request_id, "authentication failed");
            return error_response(&err, ctx.bucket.as_deref(), request_id, host_id);
        }
    };

    if let Some(bucket) = ctx.bucket.as_deref() {
        if let Some(user) = engine.keystore().user(&auth.access_key_id) {
            if !user.allows(bucket, Permission::for_method(&method)) {
                warn!(bucket, request_id, "access denied by bucket permissions");
                return error_response(&ApiError::AccessDenied, Some(bucket), request_id, host_id);
            }
        }
    }

    let body = match decode_body_if_chunked(&parts, body, &auth, &credential_provider) {
        Ok(body) => body,
        Err(err) => {
            warn!(error = %err, request_id, "chunk signature validation failed");
            return error_response(&err, ctx.bucket.as_deref(), request_id, host_id);
        }
    };

    match dispatch(engine, parts, body, ctx).await {
        Ok(response) => response,
        Err(err) => {
            debug!(error = %err, request_id, "operation returned an error");
            error_response(&err, None, request_id, host_id)
        }
    }
}

/// Resolve SigV4 header or presigned-query authentication, or the
/// anonymous user when authentication is disabled gateway-wide.
fn authenticate(parts: &http::request::Parts, body: &Bytes, engine: &Engine, credential_provider: &dyn CredentialProvider) -> Result<AuthResult, ApiError> {
    if !engine.keystore().auth_enabled() {
        return Ok(AuthResult { access_key_id: String::new(), region: engine.config().default_region.to_string(), service: "s3".to_owned(), signed_headers: Vec::new() });
    }

    let is_presigned = parts.uri.query().is_some_and(|q| q.contains("X-Amz-Signature"));
    let result = if is_presigned {
        presigned::verify_presigned(parts, credential_provider)
    } else {
        let body_hash = hash_payload(body);
        verify_sigv4(parts, &body_hash, credential_provider)
    };

    result.map_err(map_auth_error)
}

/// Narrow an [`AuthError`] down to the specific S3 `ApiError` variant it
/// corresponds to, falling back to the generic `Unauthenticated` bucket for
/// malformed/missing-credential cases that have no dedicated S3 error code.
fn map_auth_error(err: AuthError) -> ApiError {
    match err {
        AuthError::RequestExpired => ApiError::RequestTimeTooSkewed,
        AuthError::SignatureDoesNotMatch | AuthError::ChunkSignatureDoesNotMatch => ApiError::SignatureDoesNotMatch,
        AuthError::AccessKeyNotFound(_) => ApiError::InvalidAccessKeyId,
        other => ApiError::Unauthenticated(other.to_string()),
    }
}

/// If the body is an `aws-chunked` stream, decode and verify it, returning
/// the concatenated payload. Otherwise returns `body` unchanged.
fn decode_body_if_chunked(parts: &http::request::Parts, body: Bytes, auth: &AuthResult, credential_provider: &dyn CredentialProvider) -> Result<Bytes, ApiError> {
    let Some(content_sha256) = parts.headers.get("x-amz-content-sha256").and_then(|v| v.to_str().ok()) else {
        return Ok(body);
    };
    if !chunked::is_streaming_payload(content_sha256) {
        return Ok(body);
    }

    let Some(auth_header) = parts.headers.get(http::header::AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return Err(ApiError::Unauthenticated("streaming payload requires an Authorization header".to_owned()));
    };
    let parsed = parse_authorization_header(auth_header).map_err(|e| ApiError::Unauthenticated(e.to_string()))?;
    let secret_key = credential_provider.get_secret_key(&parsed.access_key_id).map_err(|e| ApiError::Unauthenticated(e.to_string()))?;
    let amz_date = parts.headers.get("x-amz-date").and_then(|v| v.to_str().ok()).unwrap_or_default().to_owned();
    let trailer_names = parts
        .headers
        .get("x-amz-trailer")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').map(|s| s.trim().to_ascii_lowercase()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let ctx = ChunkSigningContext {
        secret_key,
        date: parsed.date,
        region: parsed.region,
        service: parsed.service,
        amz_date,
        seed_signature: parsed.signature,
        trailer_names,
    };
    let _ = auth;

    chunked::decode_and_verify(&body, &ctx).map(|decoded| decoded.payload).map_err(|_| ApiError::SignatureDoesNotMatch)
}

/// Validate `x-amz-content-sha256` against the actual body, when it carries
/// a concrete hash rather than an unsigned/streaming placeholder.
fn validate_content_sha256(parts: &http::request::Parts, body: &[u8]) -> Result<(), ApiError> {
    let Some(header_value) = parts.headers.get("x-amz-content-sha256") else {
        return Ok(());
    };
    let hash_str = header_value.to_str().map_err(|_| ApiError::SignatureDoesNotMatch)?;

    if hash_str == "UNSIGNED-PAYLOAD" || chunked::is_streaming_payload(hash_str) {
        return Ok(());
    }
    if hash_str.len() != 64 || !hash_str.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ApiError::SignatureDoesNotMatch);
    }

    let actual = hex::encode(Sha256::digest(body));
    if actual == hash_str { Ok(()) } else { Err(ApiError::SignatureDoesNotMatch) }
}

fn map_routing_error(err: &crate::router::RoutingError) -> ApiError {
    match err {
        crate::router::RoutingError::MethodNotAllowed | crate::router::RoutingError::UnknownOperation => ApiError::InvalidArgument(err.to_string()),
    }
}

fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET && (path == "/_health" || path == "/health")
}

fn health_check_response() -> http::Response<S3ResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(S3ResponseBody::from_bytes(Bytes::from_static(br#"{"status":"running","service":"cargohold"}"#)))
        .expect("static health response is valid")
}

fn cors_preflight_response() -> http::Response<S3ResponseBody> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, PUT, POST, DELETE, HEAD, OPTIONS")
        .header("Access-Control-Allow-Headers", "*, Authorization, Content-Type, x-amz-*")
        .header("Access-Control-Max-Age", "86400")
        .body(S3ResponseBody::empty())
        .expect("static CORS response is valid")
}

fn add_common_headers(mut response: http::Response<S3ResponseBody>, request_id: &str, host_id: &str) -> http::Response<S3ResponseBody> {
    let headers = response.headers_mut();
    if let Ok(hv) = http::header::HeaderValue::from_str(request_id) {
        headers.insert("x-amz-request-id", hv);
    }
    if let Ok(hv) = http::header::HeaderValue::from_str(host_id) {
        headers.insert("x-amz-id-2", hv);
    }
    headers.insert("Server", http::header::HeaderValue::from_static("AmazonS3"));
    if let Ok(hv) = http::header::HeaderValue::from_str(&chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()) {
        headers.insert(http::header::DATE, hv);
    }
    response
}
