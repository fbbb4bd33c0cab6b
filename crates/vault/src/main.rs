//! `file-vault` — service binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise logging (and OTLP span export when configured).
//! 3. Load the encryption key and build the [`ContainerCodec`].
//! 4. Create the upload directory and purge scratch files left by a crash.
//! 5. Build the Axum router and start the HTTP server.

mod config;
mod crypto;
mod key;
mod server;
mod storage;
mod telemetry;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use config::Config;
use crypto::ContainerCodec;
use server::{middleware::HttpLimits, state::AppState};
use storage::Storage;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_port = cfg.listen_port,
        upload_dir = %cfg.upload_dir.display(),
        "file-vault starting"
    );

    // -----------------------------------------------------------------------
    // 3. Key material
    // -----------------------------------------------------------------------
    let key = key::load(&cfg).context("encryption key is unusable")?;
    let codec = Arc::new(ContainerCodec::new(key));
    info!(key_id = %codec.key_id(), "encryption key loaded");

    // -----------------------------------------------------------------------
    // 4. Storage
    // -----------------------------------------------------------------------
    let storage = Storage::new(cfg.upload_dir.clone(), codec);
    storage
        .init()
        .await
        .context("failed to create upload directory")?;
    storage
        .purge_scratch()
        .await
        .context("failed to purge stale scratch files")?;

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(AppState::new(storage), HttpLimits::from(&cfg));

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.listen_port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
