//! Integration tests for the cargohold S3 gateway.
//!
//! Each test spins up a real [`cargohold_http::service::GatewayService`] on
//! an ephemeral TCP port backed by an in-memory engine, then drives it with
//! [`reqwest`] exactly as an external client would. No separate server
//! process or network fixture is required.

use std::sync::{Arc, Once};

use cargohold_core::GatewayConfig;
use cargohold_engine::provider::Engine;
use cargohold_engine::storage::memory::MemoryBackend;
use cargohold_http::service::{GatewayService, ServiceConfig};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")))
            .with_test_writer()
            .init();
    });
}

/// Spawn a gateway on `127.0.0.1:0` with an in-memory backend built from
/// `config`, returning the resolved `engine` and the base URL to drive it
/// with.
pub async fn spawn_server(config: GatewayConfig) -> (Engine, String) {
    init_tracing();

    let engine = Engine::new(Arc::new(MemoryBackend::default()), config.clone());
    let service_config = ServiceConfig { domain: config.s3_domain.clone(), virtual_hosting: config.s3_virtual_hosting };
    let service = GatewayService::new(engine.clone(), &service_config);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        let http = Arc::new(HttpConnBuilder::new(TokioExecutor::new()));
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                continue;
            };
            let svc = service.clone();
            let http = http.clone();
            tokio::spawn(async move {
                let _ = http.serve_connection(TokioIo::new(stream), svc).await;
            });
        }
    });

    (engine, format!("http://{addr}"))
}

/// Spawn a gateway with default (anonymous, path-style) configuration.
pub async fn spawn_default_server() -> (Engine, String) {
    spawn_server(GatewayConfig::default()).await
}

/// A plain `reqwest` client with redirects disabled, matching how an S3 SDK
/// talks to a gateway.
#[must_use]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().redirect(reqwest::redirect::Policy::none()).build().expect("build client")
}

/// A unique bucket name for a test run.
#[must_use]
pub fn test_bucket_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("test-{prefix}-{}", &id[..8])
}

mod test_bucket;
mod test_error;
mod test_list;
mod test_multipart;
mod test_object;
mod test_presigned;
