//! cargohold - S3-compatible object storage gateway.
//!
//! # Usage
//!
//! ```text
//! GATEWAY_LISTEN=0.0.0.0:4566 cargohold-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `GATEWAY_LISTEN` | `0.0.0.0:4566` | Bind address |
//! | `S3_DOMAIN` | `s3.localhost` | Virtual hosting domain |
//! | `S3_VIRTUAL_HOSTING` | `true` | Enable `<bucket>.<domain>` addressing |
//! | `AUTHENTICATION_ENABLED` | `false` | Require SigV4/presigned auth |
//! | `STORAGE_TYPE` | `InMemory` | `InMemory` or `Filesystem` |
//! | `FILESYSTEM_DATA_DIRECTORY` | `./data/cargohold/objects` | Filesystem backend object root |
//! | `FILESYSTEM_METADATA_DIRECTORY` | `./data/cargohold/metadata` | Filesystem backend metadata root |
//! | `BUCKET_DEFAULTS_TYPE` | `GeneralPurpose` | Bucket type assigned when unspecified |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |
//! | `CARGOHOLD_CONFIG_FILE` | *(unset)* | JSON file merged on top of the above |

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cargohold_core::{GatewayConfig, StorageType};
use cargohold_engine::cleanup::sweep_orphans;
use cargohold_engine::locks::LockRegistry;
use cargohold_engine::provider::Engine;
use cargohold_engine::storage::filesystem::FilesystemBackend;
use cargohold_engine::storage::memory::MemoryBackend;
use cargohold_engine::storage::Backend;
use cargohold_http::service::{GatewayService, ServiceConfig};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Server version reported in logs.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level).with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    Ok(())
}

/// Build the storage backend named by `config.storage_type`.
fn build_storage(config: &GatewayConfig) -> Arc<dyn Backend> {
    match config.storage_type {
        StorageType::InMemory => Arc::new(MemoryBackend::default()),
        StorageType::Filesystem => Arc::new(FilesystemBackend::new(
            config.filesystem_storage.data_directory.clone(),
            config.filesystem_storage.metadata_directory.clone(),
            LockRegistry::new(),
        )),
    }
}

/// Periodically sweep orphaned object metadata and idle lock registry
/// entries until the process shuts down.
async fn run_metadata_cleanup(engine: Engine, interval_minutes: u64, batch_size: usize) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_minutes.max(1) * 60));
    ticker.tick().await; // first tick fires immediately; skip it

    loop {
        ticker.tick().await;
        let removed = sweep_orphans(&engine, batch_size).await;
        if removed > 0 {
            info!(removed, "metadata cleanup sweep removed orphaned records");
        }
    }
}

/// Run the accept loop, serving connections until a shutdown signal is received.
async fn serve(listener: TcpListener, service: GatewayService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env().context("loading configuration")?;

    init_tracing(&config.log_level)?;

    info!(
        gateway_listen = %config.gateway_listen,
        s3_domain = %config.s3_domain,
        s3_virtual_hosting = config.s3_virtual_hosting,
        storage_type = ?config.storage_type,
        authentication_enabled = config.authentication.enabled,
        version = VERSION,
        "starting cargohold",
    );

    let storage = build_storage(&config);
    let service_config = ServiceConfig { domain: config.s3_domain.clone(), virtual_hosting: config.s3_virtual_hosting };
    let engine = Engine::new(storage, config.clone());
    let service = GatewayService::new(engine.clone(), &service_config);

    tokio::spawn(run_metadata_cleanup(
        engine,
        config.metadata_cleanup.cleanup_interval_minutes,
        config.metadata_cleanup.batch_size,
    ));

    let addr: SocketAddr = config.gateway_listen.parse().with_context(|| format!("invalid bind address: {}", config.gateway_listen))?;

    let listener = TcpListener::bind(addr).await.with_context(|| format!("failed to bind to {addr}"))?;

    info!(%addr, "listening for connections");

    serve(listener, service).await
}
