//! Serve binary: bind the lookup API.
//!
//! The ingestion pipeline publishes snapshots and installs atlases into
//! the coordinator in-process; until one is installed, lookups answer
//! 404 and the health probe stays green.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use atlas_api::{app, AppState};
use atlas_core::config::POSEIDON_VARIANT;
use atlas_crypto::FieldHasher;
use atlas_lookup::LookupCoordinator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let hasher = Arc::new(FieldHasher::new(POSEIDON_VARIANT)?);
    let coordinator = Arc::new(LookupCoordinator::new(hasher));
    let environment = std::env::var("ATLAS_ENV").unwrap_or_else(|_| "development".to_string());
    let state = AppState::new(coordinator, environment);

    let addr = std::env::var("ATLAS_BIND").unwrap_or_else(|_| "0.0.0.0:8787".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "atlas-api listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
